//! Storage contract used by the match service.
//!
//! A `FixtureStore` hands out transactions; every read and write the core
//! performs goes through a `FixtureTx`, so the conflict checks and the writes
//! that follow them commit or roll back together. Dropping a transaction
//! without calling `commit` discards its writes.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::fixture::{
    ConfirmationStatus, MatchFields, MatchFilter, MatchId, MatchRecord, PendingFixture, TeamId,
    UserId,
};
use crate::models::player::SelectedPlayer;

/// Named storage constraints the core knows how to interpret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `uq_duplicate_fixture (home_id, away_id, start_time)`
    DuplicateFixture,
    /// `uq_home_fixture (home_id, start_time)`
    HomeFixture,
    /// `uq_away_fixture (away_id, start_time)`
    AwayFixture,
    /// `different_teams_check (home_id <> away_id)`
    DifferentTeams,
    /// `selections_pkey (match_id, user_id)`
    DuplicateSelection,
    /// Any foreign key
    UnknownReference,
}

impl Constraint {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uq_duplicate_fixture" => Some(Constraint::DuplicateFixture),
            "uq_home_fixture" => Some(Constraint::HomeFixture),
            "uq_away_fixture" => Some(Constraint::AwayFixture),
            "different_teams_check" => Some(Constraint::DifferentTeams),
            "selections_pkey" => Some(Constraint::DuplicateSelection),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Constraint violation: {0:?}")]
    Constraint(Constraint),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let constraint = match &e {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // unique_violation, check_violation
                Some("23505") | Some("23514") => db_err.constraint().and_then(Constraint::from_name),
                // foreign_key_violation
                Some("23503") => Some(Constraint::UnknownReference),
                _ => None,
            },
            _ => None,
        };

        match constraint {
            Some(constraint) => {
                tracing::warn!("Storage constraint fired: {:?}", constraint);
                StoreError::Constraint(constraint)
            }
            None => StoreError::Database(e),
        }
    }
}

/// One conflict-count query: matches at `start_time`, optionally narrowed by
/// home and/or away team, never counting `exclude_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictQuery {
    pub start_time: NaiveDateTime,
    pub home_id: Option<TeamId>,
    pub away_id: Option<TeamId>,
    pub exclude_id: Option<MatchId>,
}

impl ConflictQuery {
    pub fn hits(&self, record: &MatchRecord) -> bool {
        record.start_time == self.start_time
            && self.home_id.map_or(true, |home_id| record.home_id == home_id)
            && self.away_id.map_or(true, |away_id| record.away_id == away_id)
            && self.exclude_id.map_or(true, |exclude_id| record.id != exclude_id)
    }
}

/// Stored selection row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub match_id: MatchId,
    pub user_id: UserId,
    pub confirmed: ConfirmationStatus,
}

#[async_trait]
pub trait FixtureStore: Send + Sync + 'static {
    type Tx: FixtureTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
pub trait FixtureTx: Send {
    /// Serialise writers competing for the same kickoff time until commit
    async fn lock_kickoff(&mut self, start_time: NaiveDateTime) -> Result<(), StoreError>;

    async fn count_conflicts(&mut self, query: &ConflictQuery) -> Result<i64, StoreError>;

    async fn get_match(&mut self, match_id: MatchId) -> Result<Option<MatchRecord>, StoreError>;

    /// Like `get_match`, but holds the row until commit
    async fn lock_match(&mut self, match_id: MatchId) -> Result<Option<MatchRecord>, StoreError>;

    async fn list_matches(&mut self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, StoreError>;

    async fn insert_match(&mut self, fields: &MatchFields) -> Result<MatchId, StoreError>;

    async fn update_match_fields(
        &mut self,
        match_id: MatchId,
        fields: &MatchFields,
    ) -> Result<(), StoreError>;

    /// Returns false when no such match exists
    async fn delete_match(&mut self, match_id: MatchId) -> Result<bool, StoreError>;

    /// Ids from `team_ids` with no stored team
    async fn missing_teams(&mut self, team_ids: &[TeamId]) -> Result<Vec<TeamId>, StoreError>;

    /// Ids from `user_ids` with no stored user
    async fn missing_users(&mut self, user_ids: &[UserId]) -> Result<Vec<UserId>, StoreError>;

    async fn insert_selection(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        confirmed: ConfirmationStatus,
    ) -> Result<(), StoreError>;

    /// Delete all selections of a match, or only the given user's; returns rows removed
    async fn delete_selections(
        &mut self,
        match_id: MatchId,
        user_id: Option<UserId>,
    ) -> Result<u64, StoreError>;

    async fn get_selection(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
    ) -> Result<Option<Selection>, StoreError>;

    /// Returns rows updated
    async fn set_confirmation(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        confirmed: ConfirmationStatus,
    ) -> Result<u64, StoreError>;

    async fn selected_players(&mut self, match_id: MatchId)
        -> Result<Vec<SelectedPlayer>, StoreError>;

    async fn pending_confirmations(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<PendingFixture>, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_conflict_query_honours_exclusion() {
        let start_time = NaiveDate::from_ymd_opt(2021, 6, 19)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let record = MatchRecord {
            id: 4,
            home_id: 1,
            away_id: 2,
            start_time,
            result: false,
            score_home: 0,
            score_away: 0,
        };
        let query = ConflictQuery { start_time, home_id: Some(1), away_id: None, exclude_id: None };
        assert!(query.hits(&record));
        assert!(!ConflictQuery { exclude_id: Some(4), ..query }.hits(&record));
        assert!(!ConflictQuery { away_id: Some(3), ..query }.hits(&record));
    }

    #[test]
    fn test_constraint_names() {
        assert_eq!(Constraint::from_name("uq_home_fixture"), Some(Constraint::HomeFixture));
        assert_eq!(Constraint::from_name("selections_pkey"), Some(Constraint::DuplicateSelection));
        assert_eq!(Constraint::from_name("teams_name_key"), None);
    }
}
