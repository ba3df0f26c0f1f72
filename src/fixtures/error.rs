use std::fmt::{self, Display};

use crate::db::fixture_store::{Constraint, StoreError};
use crate::fixtures::validation::ConflictReason;
use crate::models::fixture::{MatchId, TeamId, UserId};

/// Reference to records that do not exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Teams(Vec<TeamId>),
    Users(Vec<UserId>),
    /// Reported by storage without the offending id
    Unknown,
}

impl Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(ids: &[i64]) -> String {
            ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        }

        match self {
            Reference::Teams(ids) => write!(f, "Unknown team id(s): {}", join(ids)),
            Reference::Users(ids) => write!(f, "Unknown user id(s): {}", join(ids)),
            Reference::Unknown => write!(f, "Unknown reference"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("{0}")]
    Conflict(ConflictReason),

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Player {0} not found")]
    PlayerNotFound(UserId),

    #[error("Player {user_id} is not selected for match {match_id}")]
    NotSelected { match_id: MatchId, user_id: UserId },

    #[error("{0}")]
    InvalidReference(Reference),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for FixtureError {
    fn from(e: StoreError) -> Self {
        match e {
            // `uq_duplicate_fixture` only fires for the identical pairing, which the
            // validator reports as a home clash; the reversed pairing has no constraint
            StoreError::Constraint(Constraint::DuplicateFixture)
            | StoreError::Constraint(Constraint::HomeFixture) => {
                FixtureError::Conflict(ConflictReason::HomeFixtureConflictForHomeTeam)
            }
            StoreError::Constraint(Constraint::AwayFixture) => {
                FixtureError::Conflict(ConflictReason::AwayFixtureConflictForAwayTeam)
            }
            StoreError::Constraint(Constraint::DifferentTeams) => {
                FixtureError::InvalidInput("Home and away teams must be different".to_string())
            }
            StoreError::Constraint(Constraint::DuplicateSelection) => {
                FixtureError::InvalidInput("Player is already selected".to_string())
            }
            StoreError::Constraint(Constraint::UnknownReference) => {
                FixtureError::InvalidReference(Reference::Unknown)
            }
            other => FixtureError::Storage(other),
        }
    }
}

impl FixtureError {
    /// Whether the caller caused the failure, as opposed to storage
    pub fn is_client_error(&self) -> bool {
        !matches!(self, FixtureError::Storage(_))
    }
}
