//! In-process fixture storage.
//!
//! Holds the whole data set behind a `tokio::sync::Mutex`. A transaction
//! takes the lock for its lifetime and works on a copy of the state, which
//! replaces the shared state on commit. Transactions are therefore fully
//! serialised, and the same constraints as the SQL schema are enforced on
//! every write.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::fixture_store::{
    ConflictQuery, Constraint, FixtureStore, FixtureTx, Selection, StoreError,
};
use crate::models::fixture::{
    ConfirmationStatus, MatchFields, MatchFilter, MatchId, MatchOrder, MatchRecord,
    PendingFixture, TeamId, UserId,
};
use crate::models::player::{Player, SelectedPlayer, Team};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    teams: BTreeMap<TeamId, Team>,
    players: BTreeMap<UserId, Player>,
    matches: BTreeMap<MatchId, MatchRecord>,
    selections: BTreeMap<(MatchId, UserId), ConfirmationStatus>,
    next_match_id: MatchId,
}

impl MemoryState {
    /// State holding the given teams and players and no fixtures
    pub fn seeded(teams: Vec<Team>, players: Vec<Player>) -> Self {
        let state = teams
            .into_iter()
            .fold(Self::default(), |state, team| state.with_team(team.id, team.name));
        players.into_iter().fold(state, |state, player| {
            state.with_player(player.id, player.name, player.surname, player.team_id)
        })
    }

    pub fn with_team(mut self, id: TeamId, name: impl Into<String>) -> Self {
        self.teams.insert(id, Team { id, name: name.into() });
        self
    }

    pub fn with_player(
        mut self,
        id: UserId,
        name: impl Into<String>,
        surname: impl Into<String>,
        team_id: Option<TeamId>,
    ) -> Self {
        self.players.insert(
            id,
            Player {
                id,
                name: name.into(),
                surname: surname.into(),
                team_id,
            },
        );
        self
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    /// Mirrors the `matches` table constraints for a row about to be written
    fn check_match_row(&self, id: MatchId, fields: &MatchFields) -> Result<(), StoreError> {
        if fields.home_id == fields.away_id {
            return Err(StoreError::Constraint(Constraint::DifferentTeams));
        }
        if !self.teams.contains_key(&fields.home_id) || !self.teams.contains_key(&fields.away_id) {
            return Err(StoreError::Constraint(Constraint::UnknownReference));
        }

        let others = self
            .matches
            .values()
            .filter(|other| other.id != id && other.start_time == fields.start_time);
        // an identical pairing also breaks the home constraint, which is reported first
        for other in others {
            if other.home_id == fields.home_id {
                return Err(StoreError::Constraint(Constraint::HomeFixture));
            }
            if other.away_id == fields.away_id {
                return Err(StoreError::Constraint(Constraint::AwayFixture));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryFixtureStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFixtureStore {
    pub fn new(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

impl Default for MemoryFixtureStore {
    fn default() -> Self {
        Self::new(MemoryState::default())
    }
}

#[async_trait]
impl FixtureStore for MemoryFixtureStore {
    type Tx = MemoryFixtureTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryFixtureTx { guard, working })
    }
}

pub struct MemoryFixtureTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl FixtureTx for MemoryFixtureTx {
    async fn lock_kickoff(&mut self, _start_time: NaiveDateTime) -> Result<(), StoreError> {
        // the store lock is already held for the whole transaction
        Ok(())
    }

    async fn count_conflicts(&mut self, query: &ConflictQuery) -> Result<i64, StoreError> {
        let count = self
            .working
            .matches
            .values()
            .filter(|record| query.hits(record))
            .count();
        Ok(count as i64)
    }

    async fn get_match(&mut self, match_id: MatchId) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.working.matches.get(&match_id).cloned())
    }

    async fn lock_match(&mut self, match_id: MatchId) -> Result<Option<MatchRecord>, StoreError> {
        self.get_match(match_id).await
    }

    async fn list_matches(&mut self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, StoreError> {
        let mut records: Vec<MatchRecord> = self
            .working
            .matches
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        match filter.order {
            Some(MatchOrder::DateAsc) => records.sort_by_key(|record| (record.start_time, record.id)),
            Some(MatchOrder::DateDesc) => {
                records.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)))
            }
            None => {}
        }
        Ok(records)
    }

    async fn insert_match(&mut self, fields: &MatchFields) -> Result<MatchId, StoreError> {
        let id = self.working.next_match_id + 1;
        self.working.check_match_row(id, fields)?;

        self.working.next_match_id = id;
        self.working.matches.insert(id, fields.into_record(id));
        Ok(id)
    }

    async fn update_match_fields(
        &mut self,
        match_id: MatchId,
        fields: &MatchFields,
    ) -> Result<(), StoreError> {
        if !self.working.matches.contains_key(&match_id) {
            return Ok(());
        }
        self.working.check_match_row(match_id, fields)?;
        self.working.matches.insert(match_id, fields.into_record(match_id));
        Ok(())
    }

    async fn delete_match(&mut self, match_id: MatchId) -> Result<bool, StoreError> {
        let removed = self.working.matches.remove(&match_id).is_some();
        if removed {
            self.working.selections.retain(|(selected_match, _), _| *selected_match != match_id);
        }
        Ok(removed)
    }

    async fn missing_teams(&mut self, team_ids: &[TeamId]) -> Result<Vec<TeamId>, StoreError> {
        let mut missing: Vec<TeamId> = team_ids
            .iter()
            .copied()
            .filter(|id| !self.working.teams.contains_key(id))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        Ok(missing)
    }

    async fn missing_users(&mut self, user_ids: &[UserId]) -> Result<Vec<UserId>, StoreError> {
        let mut missing: Vec<UserId> = user_ids
            .iter()
            .copied()
            .filter(|id| !self.working.players.contains_key(id))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        Ok(missing)
    }

    async fn insert_selection(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        confirmed: ConfirmationStatus,
    ) -> Result<(), StoreError> {
        if !self.working.matches.contains_key(&match_id)
            || !self.working.players.contains_key(&user_id)
        {
            return Err(StoreError::Constraint(Constraint::UnknownReference));
        }
        if self.working.selections.contains_key(&(match_id, user_id)) {
            return Err(StoreError::Constraint(Constraint::DuplicateSelection));
        }
        self.working.selections.insert((match_id, user_id), confirmed);
        Ok(())
    }

    async fn delete_selections(
        &mut self,
        match_id: MatchId,
        user_id: Option<UserId>,
    ) -> Result<u64, StoreError> {
        let before = self.working.selections.len();
        self.working.selections.retain(|(selected_match, selected_user), _| {
            *selected_match != match_id || user_id.map_or(false, |user_id| *selected_user != user_id)
        });
        Ok((before - self.working.selections.len()) as u64)
    }

    async fn get_selection(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
    ) -> Result<Option<Selection>, StoreError> {
        Ok(self
            .working
            .selections
            .get(&(match_id, user_id))
            .map(|&confirmed| Selection {
                match_id,
                user_id,
                confirmed,
            }))
    }

    async fn set_confirmation(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        confirmed: ConfirmationStatus,
    ) -> Result<u64, StoreError> {
        match self.working.selections.get_mut(&(match_id, user_id)) {
            Some(status) => {
                *status = confirmed;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn selected_players(
        &mut self,
        match_id: MatchId,
    ) -> Result<Vec<SelectedPlayer>, StoreError> {
        let players = self
            .working
            .selections
            .range((match_id, UserId::MIN)..=(match_id, UserId::MAX))
            .filter_map(|(&(_, user_id), &confirmed)| {
                self.working.players.get(&user_id).map(|player| {
                    SelectedPlayer::new(player.id, player.name.clone(), player.surname.clone(), confirmed)
                })
            })
            .collect();
        Ok(players)
    }

    async fn pending_confirmations(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<PendingFixture>, StoreError> {
        let mut pending: Vec<PendingFixture> = self
            .working
            .selections
            .iter()
            .filter(|(key, confirmed)| key.1 == user_id && confirmed.is_pending())
            .filter_map(|(&(match_id, _), &confirmed)| {
                self.working.matches.get(&match_id).map(|record| PendingFixture {
                    match_id,
                    start_time: record.start_time,
                    home_id: record.home_id,
                    away_id: record.away_id,
                    confirmed,
                })
            })
            .collect();
        pending.sort_by_key(|fixture| (fixture.start_time, fixture.match_id));
        Ok(pending)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryFixtureTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
