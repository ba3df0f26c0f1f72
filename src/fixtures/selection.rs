use crate::db::fixture_store::FixtureTx;
use crate::fixtures::confirmation::ConfirmationMachine;
use crate::fixtures::error::{FixtureError, Reference};
use crate::models::fixture::{MatchId, SelectionChoice, SelectionOutcome, UserId};

/// Maintains which players are in a match's squad
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionManager;

impl SelectionManager {
    pub fn new() -> Self {
        Self
    }

    /// What a choice does to a player who is (or is not) currently selected
    pub fn decide(selected: bool, choice: SelectionChoice) -> SelectionOutcome {
        match (choice, selected) {
            (SelectionChoice::Yes, false) | (SelectionChoice::Toggle, false) => SelectionOutcome::Added,
            (SelectionChoice::No, true) | (SelectionChoice::Toggle, true) => SelectionOutcome::Removed,
            _ => SelectionOutcome::Unchanged,
        }
    }

    pub async fn is_selected<T: FixtureTx>(
        &self,
        tx: &mut T,
        match_id: MatchId,
        user_id: UserId,
    ) -> Result<bool, FixtureError> {
        Ok(tx.get_selection(match_id, user_id).await?.is_some())
    }

    /// Reject a selection list naming users that do not exist
    pub async fn ensure_players_exist<T: FixtureTx>(
        &self,
        tx: &mut T,
        user_ids: &[UserId],
    ) -> Result<(), FixtureError> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let missing = tx.missing_users(user_ids).await?;
        if !missing.is_empty() {
            return Err(FixtureError::InvalidReference(Reference::Users(missing)));
        }
        Ok(())
    }

    /// Apply a single choice for one player. The caller holds the match lock.
    pub async fn apply<T: FixtureTx>(
        &self,
        tx: &mut T,
        match_id: MatchId,
        user_id: UserId,
        choice: SelectionChoice,
    ) -> Result<SelectionOutcome, FixtureError> {
        let selected = self.is_selected(tx, match_id, user_id).await?;
        let outcome = Self::decide(selected, choice);

        match outcome {
            SelectionOutcome::Added => {
                tx.insert_selection(match_id, user_id, ConfirmationMachine::initial())
                    .await?;
            }
            SelectionOutcome::Removed => {
                tx.delete_selections(match_id, Some(user_id)).await?;
            }
            SelectionOutcome::Unchanged => {}
        }

        Ok(outcome)
    }

    /// Select every listed player for a newly created match
    pub async fn select_all<T: FixtureTx>(
        &self,
        tx: &mut T,
        match_id: MatchId,
        user_ids: &[UserId],
    ) -> Result<(), FixtureError> {
        for &user_id in user_ids {
            tx.insert_selection(match_id, user_id, ConfirmationMachine::initial())
                .await?;
        }
        Ok(())
    }

    /// Replace the whole squad. Every listed player starts over at `NONE`,
    /// including players who were already selected.
    pub async fn replace_all<T: FixtureTx>(
        &self,
        tx: &mut T,
        match_id: MatchId,
        user_ids: &[UserId],
    ) -> Result<u64, FixtureError> {
        let removed = tx.delete_selections(match_id, None).await?;
        self.select_all(tx, match_id, user_ids).await?;

        tracing::debug!(
            "Replaced selections for match {}: {} removed, {} added",
            match_id,
            removed,
            user_ids.len()
        );
        Ok(removed)
    }
}
