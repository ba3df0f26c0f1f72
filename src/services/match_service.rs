use crate::db::fixture_store::{FixtureStore, FixtureTx};
use crate::fixtures::{
    ConfirmationMachine, FixtureCandidate, FixtureError, FixtureValidator, Reference,
    SelectionManager,
};
use crate::models::fixture::{
    validate_different_teams, ConfirmationChoice, ConfirmationStatus, Match, MatchFilter, MatchId,
    MatchPatch, NewMatch, PendingFixture, SelectionChoice, SelectionOutcome, SelectionStatus,
    TeamId, UserId,
};

/// Service for creating, changing and staffing matches.
///
/// Every operation runs in one storage transaction: the conflict checks see
/// the same data the writes commit against, and a failure anywhere leaves no
/// partial writes behind.
pub struct MatchService<S: FixtureStore> {
    store: S,
    validator: FixtureValidator,
    selections: SelectionManager,
    confirmations: ConfirmationMachine,
}

impl<S: FixtureStore> MatchService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            validator: FixtureValidator::new(),
            selections: SelectionManager::new(),
            confirmations: ConfirmationMachine::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a match and its initial squad
    #[tracing::instrument(
        name = "Create match",
        skip(self, new_match),
        fields(
            home_id = %new_match.home_id,
            away_id = %new_match.away_id,
            start_time = %new_match.start_time
        )
    )]
    pub async fn create_match(&self, new_match: NewMatch) -> Result<Match, FixtureError> {
        new_match.validate().map_err(FixtureError::InvalidInput)?;
        let fields = new_match.fields();

        let mut tx = self.store.begin().await?;
        tx.lock_kickoff(fields.start_time).await?;

        ensure_teams_exist(&mut tx, fields.home_id, fields.away_id).await?;
        self.selections
            .ensure_players_exist(&mut tx, &new_match.selections)
            .await?;
        self.validator
            .validate(&mut tx, &FixtureCandidate::from(&fields), None)
            .await?;

        let match_id = tx.insert_match(&fields).await?;
        self.selections
            .select_all(&mut tx, match_id, &new_match.selections)
            .await?;

        let created = load_match(&mut tx, match_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Created match {} with {} selected players",
            created.id,
            created.selections.len()
        );
        Ok(created)
    }

    /// Apply a partial update. A new selection list replaces the old one and
    /// resets every listed player's confirmation.
    #[tracing::instrument(name = "Update match", skip(self, patch), fields(match_id = %match_id))]
    pub async fn update_match(&self, match_id: MatchId, patch: MatchPatch) -> Result<Match, FixtureError> {
        patch.validate().map_err(FixtureError::InvalidInput)?;

        let mut tx = self.store.begin().await?;
        let stored = tx
            .lock_match(match_id)
            .await?
            .ok_or(FixtureError::MatchNotFound(match_id))?;

        let merged = patch.merge_onto(stored.fields());
        validate_different_teams(merged.home_id, merged.away_id).map_err(FixtureError::InvalidInput)?;
        tx.lock_kickoff(merged.start_time).await?;

        if patch.home_id.is_some() || patch.away_id.is_some() {
            ensure_teams_exist(&mut tx, merged.home_id, merged.away_id).await?;
        }
        if let Some(selections) = &patch.selections {
            self.selections.ensure_players_exist(&mut tx, selections).await?;
        }

        let candidate = FixtureCandidate::resolve(&patch, &stored);
        self.validator
            .validate(&mut tx, &candidate, Some(match_id))
            .await?;

        if patch.has_scalar_changes() {
            tx.update_match_fields(match_id, &merged).await?;
        }
        if let Some(selections) = &patch.selections {
            self.selections
                .replace_all(&mut tx, match_id, selections)
                .await?;
        }

        let updated = load_match(&mut tx, match_id).await?;
        tx.commit().await?;

        tracing::info!("Updated match {}", match_id);
        Ok(updated)
    }

    /// Delete a match together with its selections
    #[tracing::instrument(name = "Delete match", skip(self), fields(match_id = %match_id))]
    pub async fn delete_match(&self, match_id: MatchId) -> Result<(), FixtureError> {
        let mut tx = self.store.begin().await?;
        if tx.lock_match(match_id).await?.is_none() {
            return Err(FixtureError::MatchNotFound(match_id));
        }

        let removed = tx.delete_selections(match_id, None).await?;
        tx.delete_match(match_id).await?;
        tx.commit().await?;

        tracing::info!("Deleted match {} and {} selections", match_id, removed);
        Ok(())
    }

    #[tracing::instrument(name = "Get match", skip(self), fields(match_id = %match_id))]
    pub async fn get_match(&self, match_id: MatchId) -> Result<Match, FixtureError> {
        let mut tx = self.store.begin().await?;
        load_match(&mut tx, match_id).await
    }

    /// Get a match only if the team plays in it
    #[tracing::instrument(
        name = "Get match for team",
        skip(self),
        fields(match_id = %match_id, team_id = %team_id)
    )]
    pub async fn get_match_for_team(&self, match_id: MatchId, team_id: TeamId) -> Result<Match, FixtureError> {
        let found = self.get_match(match_id).await?;
        if found.home_id != team_id && found.away_id != team_id {
            return Err(FixtureError::MatchNotFound(match_id));
        }
        Ok(found)
    }

    #[tracing::instrument(name = "List matches", skip(self, filter))]
    pub async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<Match>, FixtureError> {
        let mut tx = self.store.begin().await?;
        let records = tx.list_matches(filter).await?;

        let mut matches = Vec::with_capacity(records.len());
        for record in records {
            let players = tx.selected_players(record.id).await?;
            matches.push(Match::from_parts(record, players));
        }
        Ok(matches)
    }

    /// Add or remove a player from a match's squad
    #[tracing::instrument(
        name = "Set selection",
        skip(self),
        fields(match_id = %match_id, user_id = %user_id, choice = ?choice)
    )]
    pub async fn set_selection(
        &self,
        match_id: MatchId,
        user_id: UserId,
        choice: SelectionChoice,
    ) -> Result<SelectionOutcome, FixtureError> {
        let mut tx = self.store.begin().await?;
        ensure_match_locked(&mut tx, match_id).await?;
        ensure_player_exists(&mut tx, user_id).await?;

        let outcome = self.selections.apply(&mut tx, match_id, user_id, choice).await?;
        tx.commit().await?;

        tracing::info!("Selection of player {} for match {}: {:?}", user_id, match_id, outcome);
        Ok(outcome)
    }

    /// Record a selected player's availability
    #[tracing::instrument(
        name = "Set confirmation",
        skip(self),
        fields(match_id = %match_id, user_id = %user_id, choice = ?choice)
    )]
    pub async fn set_confirmation(
        &self,
        match_id: MatchId,
        user_id: UserId,
        choice: ConfirmationChoice,
    ) -> Result<ConfirmationStatus, FixtureError> {
        let mut tx = self.store.begin().await?;
        ensure_match_locked(&mut tx, match_id).await?;
        ensure_player_exists(&mut tx, user_id).await?;

        let status = self
            .confirmations
            .confirm(&mut tx, match_id, user_id, choice)
            .await?;
        tx.commit().await?;

        tracing::info!("Player {} is {} for match {}", user_id, status, match_id);
        Ok(status)
    }

    pub async fn is_selected(&self, match_id: MatchId, user_id: UserId) -> Result<bool, FixtureError> {
        let mut tx = self.store.begin().await?;
        self.selections.is_selected(&mut tx, match_id, user_id).await
    }

    /// Whether a player is selected, and their availability if so
    #[tracing::instrument(name = "Get selection status", skip(self))]
    pub async fn selection_status(
        &self,
        match_id: MatchId,
        user_id: UserId,
    ) -> Result<SelectionStatus, FixtureError> {
        let mut tx = self.store.begin().await?;
        if tx.get_match(match_id).await?.is_none() {
            return Err(FixtureError::MatchNotFound(match_id));
        }
        ensure_player_exists(&mut tx, user_id).await?;

        let selection = tx.get_selection(match_id, user_id).await?;
        Ok(SelectionStatus {
            selected: selection.is_some(),
            confirmed: selection.map(|selection| selection.confirmed),
        })
    }

    /// Fixtures the player is selected for but has not confirmed or declined
    #[tracing::instrument(name = "Get pending confirmations", skip(self))]
    pub async fn pending_confirmations(&self, user_id: UserId) -> Result<Vec<PendingFixture>, FixtureError> {
        let mut tx = self.store.begin().await?;
        ensure_player_exists(&mut tx, user_id).await?;
        Ok(tx.pending_confirmations(user_id).await?)
    }
}

async fn load_match<T: FixtureTx>(tx: &mut T, match_id: MatchId) -> Result<Match, FixtureError> {
    let record = tx
        .get_match(match_id)
        .await?
        .ok_or(FixtureError::MatchNotFound(match_id))?;
    let players = tx.selected_players(match_id).await?;
    Ok(Match::from_parts(record, players))
}

async fn ensure_match_locked<T: FixtureTx>(tx: &mut T, match_id: MatchId) -> Result<(), FixtureError> {
    match tx.lock_match(match_id).await? {
        Some(_) => Ok(()),
        None => Err(FixtureError::MatchNotFound(match_id)),
    }
}

async fn ensure_player_exists<T: FixtureTx>(tx: &mut T, user_id: UserId) -> Result<(), FixtureError> {
    if tx.missing_users(&[user_id]).await?.is_empty() {
        Ok(())
    } else {
        Err(FixtureError::PlayerNotFound(user_id))
    }
}

async fn ensure_teams_exist<T: FixtureTx>(
    tx: &mut T,
    home_id: TeamId,
    away_id: TeamId,
) -> Result<(), FixtureError> {
    let missing = tx.missing_teams(&[home_id, away_id]).await?;
    if !missing.is_empty() {
        return Err(FixtureError::InvalidReference(Reference::Teams(missing)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryFixtureStore, MemoryState};
    use crate::fixtures::ConflictReason;
    use chrono::{NaiveDate, NaiveDateTime};

    fn kickoff() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 19)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    fn service() -> MatchService<MemoryFixtureStore> {
        MatchService::new(MemoryFixtureStore::new(
            MemoryState::default()
                .with_team(1, "Team 1")
                .with_team(2, "Team 2")
                .with_team(3, "Team 3")
                .with_player(10, "Ann", "Walsh", Some(1))
                .with_player(11, "Brian", "Kelly", Some(1)),
        ))
    }

    fn new_match(home_id: TeamId, away_id: TeamId) -> NewMatch {
        NewMatch {
            home_id,
            away_id,
            start_time: kickoff(),
            result: false,
            score_home: 0,
            score_away: 0,
            selections: vec![],
        }
    }

    #[tokio::test]
    async fn test_failed_validation_leaves_no_writes() {
        let service = service();
        service.create_match(new_match(1, 2)).await.unwrap();

        let mut clash = new_match(1, 3);
        clash.selections = vec![10];
        let err = service.create_match(clash).await.unwrap_err();
        assert!(matches!(err, FixtureError::Conflict(ConflictReason::HomeFixtureConflictForHomeTeam)));

        let state = service.store().snapshot().await;
        assert_eq!(state.match_count(), 1);
        assert_eq!(state.selection_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_team_is_an_invalid_reference() {
        let service = service();
        let err = service.create_match(new_match(1, 9)).await.unwrap_err();
        assert!(matches!(err, FixtureError::InvalidReference(Reference::Teams(ref ids)) if ids == &vec![9]));
    }

    #[tokio::test]
    async fn test_update_swapping_into_same_team_is_rejected() {
        let service = service();
        let created = service.create_match(new_match(1, 2)).await.unwrap();
        let patch = MatchPatch { away_id: Some(1), ..Default::default() };
        let err = service.update_match(created.id, patch).await.unwrap_err();
        assert!(matches!(err, FixtureError::InvalidInput(_)));
    }
}
