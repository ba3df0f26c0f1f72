use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use crate::db::fixture_store::{ConflictQuery, FixtureStore, FixtureTx, Selection, StoreError};
use crate::models::fixture::{
    ConfirmationStatus, MatchFields, MatchFilter, MatchId, MatchOrder, MatchRecord,
    PendingFixture, TeamId, UserId,
};
use crate::models::player::SelectedPlayer;

const MATCH_COLUMNS: &str = "id, home_id, away_id, start_time, result, score_home, score_away";

/// PostgreSQL-backed fixture storage
#[derive(Debug, Clone)]
pub struct PgFixtureStore {
    pool: PgPool,
}

impl PgFixtureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl FixtureStore for PgFixtureStore {
    type Tx = PgFixtureTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgFixtureTx { tx })
    }
}

/// An open Postgres transaction; rolled back on drop unless committed
pub struct PgFixtureTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct SelectionRow {
    match_id: MatchId,
    user_id: UserId,
    confirmed: ConfirmationStatus,
}

#[async_trait]
impl FixtureTx for PgFixtureTx {
    async fn lock_kickoff(&mut self, start_time: NaiveDateTime) -> Result<(), StoreError> {
        let key = start_time.and_utc().timestamp();
        debug!("Taking kickoff lock {} for {}", key, start_time);

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn count_conflicts(&mut self, query: &ConflictQuery) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM matches
            WHERE start_time = $1
              AND ($2::BIGINT IS NULL OR home_id = $2)
              AND ($3::BIGINT IS NULL OR away_id = $3)
              AND ($4::BIGINT IS NULL OR id <> $4)
            "#,
        )
        .bind(query.start_time)
        .bind(query.home_id)
        .bind(query.away_id)
        .bind(query.exclude_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn get_match(&mut self, match_id: MatchId) -> Result<Option<MatchRecord>, StoreError> {
        let record = sqlx::query_as::<_, MatchRecord>(&format!(
            "SELECT {} FROM matches WHERE id = $1",
            MATCH_COLUMNS
        ))
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(record)
    }

    async fn lock_match(&mut self, match_id: MatchId) -> Result<Option<MatchRecord>, StoreError> {
        let record = sqlx::query_as::<_, MatchRecord>(&format!(
            "SELECT {} FROM matches WHERE id = $1 FOR UPDATE",
            MATCH_COLUMNS
        ))
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(record)
    }

    async fn list_matches(&mut self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM matches WHERE TRUE", MATCH_COLUMNS));

        if let Some(team) = filter.team {
            builder
                .push(" AND (home_id = ")
                .push_bind(team)
                .push(" OR away_id = ")
                .push_bind(team)
                .push(")");
        }
        if let Some(opposition) = filter.opposition {
            builder
                .push(" AND (home_id = ")
                .push_bind(opposition)
                .push(" OR away_id = ")
                .push_bind(opposition)
                .push(")");
        }
        if let Some((range, date)) = filter.date_criterion() {
            builder
                .push(" AND DATE(start_time) ")
                .push(range.sql_operator())
                .push(" ")
                .push_bind(date);
        }
        builder.push(match filter.order {
            Some(MatchOrder::DateAsc) => " ORDER BY start_time ASC, id ASC",
            Some(MatchOrder::DateDesc) => " ORDER BY start_time DESC, id ASC",
            None => " ORDER BY id ASC",
        });

        let records = builder
            .build_query_as::<MatchRecord>()
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(records)
    }

    async fn insert_match(&mut self, fields: &MatchFields) -> Result<MatchId, StoreError> {
        let match_id: MatchId = sqlx::query_scalar(
            r#"
            INSERT INTO matches (home_id, away_id, start_time, result, score_home, score_away)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(fields.home_id)
        .bind(fields.away_id)
        .bind(fields.start_time)
        .bind(fields.result)
        .bind(fields.score_home)
        .bind(fields.score_away)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(match_id)
    }

    async fn update_match_fields(
        &mut self,
        match_id: MatchId,
        fields: &MatchFields,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE matches
            SET
                home_id = $2,
                away_id = $3,
                start_time = $4,
                result = $5,
                score_home = $6,
                score_away = $7
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .bind(fields.home_id)
        .bind(fields.away_id)
        .bind(fields.start_time)
        .bind(fields.result)
        .bind(fields.score_home)
        .bind(fields.score_away)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_match(&mut self, match_id: MatchId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn missing_teams(&mut self, team_ids: &[TeamId]) -> Result<Vec<TeamId>, StoreError> {
        let missing: Vec<TeamId> = sqlx::query_scalar(
            r#"
            SELECT requested.id
            FROM UNNEST($1::BIGINT[]) AS requested(id)
            WHERE NOT EXISTS (SELECT 1 FROM teams t WHERE t.id = requested.id)
            ORDER BY requested.id
            "#,
        )
        .bind(team_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(missing)
    }

    async fn missing_users(&mut self, user_ids: &[UserId]) -> Result<Vec<UserId>, StoreError> {
        let missing: Vec<UserId> = sqlx::query_scalar(
            r#"
            SELECT requested.id
            FROM UNNEST($1::BIGINT[]) AS requested(id)
            WHERE NOT EXISTS (SELECT 1 FROM users u WHERE u.id = requested.id)
            ORDER BY requested.id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(missing)
    }

    async fn insert_selection(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        confirmed: ConfirmationStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO selections (match_id, user_id, confirmed) VALUES ($1, $2, $3)")
            .bind(match_id)
            .bind(user_id)
            .bind(confirmed)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_selections(
        &mut self,
        match_id: MatchId,
        user_id: Option<UserId>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM selections WHERE match_id = $1 AND ($2::BIGINT IS NULL OR user_id = $2)",
        )
        .bind(match_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_selection(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
    ) -> Result<Option<Selection>, StoreError> {
        let row = sqlx::query_as::<_, SelectionRow>(
            "SELECT match_id, user_id, confirmed FROM selections WHERE match_id = $1 AND user_id = $2",
        )
        .bind(match_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| Selection {
            match_id: row.match_id,
            user_id: row.user_id,
            confirmed: row.confirmed,
        }))
    }

    async fn set_confirmation(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        confirmed: ConfirmationStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE selections SET confirmed = $3 WHERE match_id = $1 AND user_id = $2",
        )
        .bind(match_id)
        .bind(user_id)
        .bind(confirmed)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn selected_players(
        &mut self,
        match_id: MatchId,
    ) -> Result<Vec<SelectedPlayer>, StoreError> {
        let players = sqlx::query_as::<_, SelectedPlayer>(
            r#"
            SELECT u.id, u.name, u.surname, s.confirmed
            FROM selections s
            JOIN users u ON u.id = s.user_id
            WHERE s.match_id = $1
            ORDER BY u.id ASC
            "#,
        )
        .bind(match_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(players)
    }

    async fn pending_confirmations(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<PendingFixture>, StoreError> {
        let pending = sqlx::query_as::<_, PendingFixture>(
            r#"
            SELECT m.id AS match_id, m.start_time, m.home_id, m.away_id, s.confirmed
            FROM selections s
            JOIN matches m ON m.id = s.match_id
            WHERE s.user_id = $1
              AND s.confirmed IN ($2, $3)
            ORDER BY m.start_time ASC, m.id ASC
            "#,
        )
        .bind(user_id)
        .bind(ConfirmationStatus::None)
        .bind(ConfirmationStatus::Maybe)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(pending)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
