use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::fixture::{ConfirmationStatus, TeamId, UserId};

/// A player on a match's selection list, as returned with the match
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SelectedPlayer {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub confirmed: ConfirmationStatus,
}

impl SelectedPlayer {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        surname: impl Into<String>,
        confirmed: ConfirmationStatus,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            surname: surname.into(),
            confirmed,
        }
    }
}

/// Squad member known to storage
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub team_id: Option<TeamId>,
}

/// Team known to storage
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}
