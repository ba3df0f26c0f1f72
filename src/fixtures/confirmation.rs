use crate::db::fixture_store::FixtureTx;
use crate::fixtures::error::FixtureError;
use crate::models::fixture::{ConfirmationChoice, ConfirmationStatus, MatchId, UserId};

/// Availability tracking for selected players.
///
/// `NONE` is the entry state on selection. From any state a confirmation
/// moves the player to `NOT_AVAILABLE`, `MAYBE` or `CONFIRMED`; nothing but a
/// fresh selection leads back to `NONE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationMachine;

impl ConfirmationMachine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial() -> ConfirmationStatus {
        ConfirmationStatus::None
    }

    /// State a choice leads to; the same from every current state
    pub fn transition(choice: ConfirmationChoice) -> ConfirmationStatus {
        match choice {
            ConfirmationChoice::Yes => ConfirmationStatus::Confirmed,
            ConfirmationChoice::No => ConfirmationStatus::NotAvailable,
            ConfirmationChoice::Maybe => ConfirmationStatus::Maybe,
        }
    }

    /// Record a selected player's answer. The caller holds the match lock.
    pub async fn confirm<T: FixtureTx>(
        &self,
        tx: &mut T,
        match_id: MatchId,
        user_id: UserId,
        choice: ConfirmationChoice,
    ) -> Result<ConfirmationStatus, FixtureError> {
        let selection = tx
            .get_selection(match_id, user_id)
            .await?
            .ok_or(FixtureError::NotSelected { match_id, user_id })?;

        let next = Self::transition(choice);
        if next != selection.confirmed {
            tx.set_confirmation(match_id, user_id, next).await?;
        }

        tracing::debug!(
            "Player {} for match {}: {} -> {}",
            user_id,
            match_id,
            selection.confirmed,
            next
        );
        Ok(next)
    }
}
