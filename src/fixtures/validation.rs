use std::fmt::{self, Display};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::fixture_store::{ConflictQuery, FixtureTx};
use crate::fixtures::error::FixtureError;
use crate::models::fixture::{MatchFields, MatchId, MatchPatch, MatchRecord, TeamId};

/// Why a candidate fixture cannot be scheduled
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Another fixture at the same time has the home team playing away
    AwayFixtureConflictForHomeTeam,
    /// Another fixture at the same time has the away team playing at home
    HomeFixtureConflictForAwayTeam,
    /// The reversed pairing is already scheduled at the same time
    DuplicateFixture,
    /// The home team already has a home fixture at the same time
    HomeFixtureConflictForHomeTeam,
    /// The away team already has an away fixture at the same time
    AwayFixtureConflictForAwayTeam,
}

/// Evaluation order; the first check that finds a clash decides the reason.
///
/// The reversed pairing is checked before the cross-venue checks, otherwise an
/// exact reverse fixture would always be reported as a team conflict.
pub const CHECK_ORDER: [ConflictReason; 5] = [
    ConflictReason::DuplicateFixture,
    ConflictReason::AwayFixtureConflictForHomeTeam,
    ConflictReason::HomeFixtureConflictForAwayTeam,
    ConflictReason::HomeFixtureConflictForHomeTeam,
    ConflictReason::AwayFixtureConflictForAwayTeam,
];

impl ConflictReason {
    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::AwayFixtureConflictForHomeTeam => "Away fixture conflict for Home team",
            ConflictReason::HomeFixtureConflictForAwayTeam => "Home fixture conflict for Away team",
            ConflictReason::DuplicateFixture => "Duplicate fixture exists",
            ConflictReason::HomeFixtureConflictForHomeTeam => "Home fixture conflict for Home team",
            ConflictReason::AwayFixtureConflictForAwayTeam => "Away fixture conflict for Away team",
        }
    }

    /// Count query that detects this clash for a fully resolved candidate
    pub fn query(
        &self,
        home_id: TeamId,
        away_id: TeamId,
        start_time: NaiveDateTime,
        exclude_id: Option<MatchId>,
    ) -> ConflictQuery {
        let (home_filter, away_filter) = match self {
            ConflictReason::AwayFixtureConflictForHomeTeam => (None, Some(home_id)),
            ConflictReason::HomeFixtureConflictForAwayTeam => (Some(away_id), None),
            ConflictReason::DuplicateFixture => (Some(away_id), Some(home_id)),
            ConflictReason::HomeFixtureConflictForHomeTeam => (Some(home_id), None),
            ConflictReason::AwayFixtureConflictForAwayTeam => (None, Some(away_id)),
        };

        ConflictQuery {
            start_time,
            home_id: home_filter,
            away_id: away_filter,
            exclude_id,
        }
    }
}

impl Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The scheduling-relevant part of a match about to be written.
///
/// Conflict checking only runs when all three parts are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureCandidate {
    pub home_id: Option<TeamId>,
    pub away_id: Option<TeamId>,
    pub start_time: Option<NaiveDateTime>,
}

impl FixtureCandidate {
    /// Candidate for an update: patched values win, the rest comes from storage
    pub fn resolve(patch: &MatchPatch, stored: &MatchRecord) -> Self {
        Self {
            home_id: patch.home_id.or(Some(stored.home_id)),
            away_id: patch.away_id.or(Some(stored.away_id)),
            start_time: patch.start_time.or(Some(stored.start_time)),
        }
    }

    fn complete(&self) -> Option<(TeamId, TeamId, NaiveDateTime)> {
        match (self.home_id, self.away_id, self.start_time) {
            (Some(home_id), Some(away_id), Some(start_time)) => Some((home_id, away_id, start_time)),
            _ => None,
        }
    }

    /// Queries to run, in evaluation order
    pub fn conflict_queries(&self, excluding: Option<MatchId>) -> Vec<(ConflictReason, ConflictQuery)> {
        match self.complete() {
            Some((home_id, away_id, start_time)) => CHECK_ORDER
                .iter()
                .map(|reason| (*reason, reason.query(home_id, away_id, start_time, excluding)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// First clash against an in-memory set of fixtures
    pub fn first_conflict(&self, existing: &[MatchRecord], excluding: Option<MatchId>) -> Option<ConflictReason> {
        self.conflict_queries(excluding)
            .into_iter()
            .find(|(_, query)| existing.iter().any(|record| query.hits(record)))
            .map(|(reason, _)| reason)
    }
}

impl From<&MatchFields> for FixtureCandidate {
    fn from(fields: &MatchFields) -> Self {
        Self {
            home_id: Some(fields.home_id),
            away_id: Some(fields.away_id),
            start_time: Some(fields.start_time),
        }
    }
}

/// Decides whether a candidate fixture can be persisted next to the existing ones
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureValidator;

impl FixtureValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run the conflict checks inside the caller's transaction.
    ///
    /// `excluding` is the id of the match being updated, which never counts
    /// as a clash with itself.
    pub async fn validate<T: FixtureTx>(
        &self,
        tx: &mut T,
        candidate: &FixtureCandidate,
        excluding: Option<MatchId>,
    ) -> Result<(), FixtureError> {
        for (reason, query) in candidate.conflict_queries(excluding) {
            let count = tx.count_conflicts(&query).await?;
            if count > 0 {
                tracing::warn!(
                    "Fixture rejected: {} (home {:?}, away {:?}, kickoff {:?}, {} clashing)",
                    reason,
                    candidate.home_id,
                    candidate.away_id,
                    candidate.start_time,
                    count
                );
                return Err(FixtureError::Conflict(reason));
            }
        }

        Ok(())
    }
}
