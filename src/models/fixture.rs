// src/models/fixture.rs
use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::player::SelectedPlayer;

pub type MatchId = i64;
pub type TeamId = i64;
pub type UserId = i64;

/// Scalar columns of a persisted match, as stored in the `matches` table
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub id: MatchId,
    pub home_id: TeamId,
    pub away_id: TeamId,
    pub start_time: NaiveDateTime,
    pub result: bool,
    pub score_home: i32,
    pub score_away: i32,
}

impl MatchRecord {
    pub fn fields(&self) -> MatchFields {
        MatchFields {
            home_id: self.home_id,
            away_id: self.away_id,
            start_time: self.start_time,
            result: self.result,
            score_home: self.score_home,
            score_away: self.score_away,
        }
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.home_id == team_id || self.away_id == team_id
    }
}

/// Writable scalar fields of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFields {
    pub home_id: TeamId,
    pub away_id: TeamId,
    pub start_time: NaiveDateTime,
    pub result: bool,
    pub score_home: i32,
    pub score_away: i32,
}

impl MatchFields {
    pub fn into_record(self, id: MatchId) -> MatchRecord {
        MatchRecord {
            id,
            home_id: self.home_id,
            away_id: self.away_id,
            start_time: self.start_time,
            result: self.result,
            score_home: self.score_home,
            score_away: self.score_away,
        }
    }
}

/// A match as returned to callers, with its selection list attached
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: MatchId,
    pub home_id: TeamId,
    pub away_id: TeamId,
    #[serde(with = "kickoff")]
    pub start_time: NaiveDateTime,
    pub result: bool,
    pub score_home: i32,
    pub score_away: i32,
    pub selections: Vec<SelectedPlayer>,
}

impl Match {
    pub fn from_parts(record: MatchRecord, selections: Vec<SelectedPlayer>) -> Self {
        Self {
            id: record.id,
            home_id: record.home_id,
            away_id: record.away_id,
            start_time: record.start_time,
            result: record.result,
            score_home: record.score_home,
            score_away: record.score_away,
            selections,
        }
        .standardise()
    }

    /// Sort the selection list by ascending player id
    pub fn standardise(mut self) -> Self {
        self.selections.sort_by_key(|player| player.id);
        self
    }

    pub fn selected_ids(&self) -> Vec<UserId> {
        self.selections.iter().map(|player| player.id).collect()
    }
}

/// Request to create a new match
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct NewMatch {
    pub home_id: TeamId,
    pub away_id: TeamId,
    #[serde(with = "kickoff")]
    pub start_time: NaiveDateTime,
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub score_home: i32,
    #[serde(default)]
    pub score_away: i32,
    #[serde(default)]
    pub selections: Vec<UserId>,
}

impl NewMatch {
    pub fn validate(&self) -> Result<(), String> {
        validate_team_id("home_id", self.home_id)?;
        validate_team_id("away_id", self.away_id)?;
        validate_score("score_home", self.score_home)?;
        validate_score("score_away", self.score_away)?;
        validate_different_teams(self.home_id, self.away_id)?;
        validate_selections(&self.selections)
    }

    pub fn fields(&self) -> MatchFields {
        MatchFields {
            home_id: self.home_id,
            away_id: self.away_id,
            start_time: self.start_time,
            result: self.result,
            score_home: self.score_home,
            score_away: self.score_away,
        }
    }
}

/// Partial update of a match; absent fields keep their stored value
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct MatchPatch {
    pub home_id: Option<TeamId>,
    pub away_id: Option<TeamId>,
    #[serde(default, with = "kickoff::option")]
    pub start_time: Option<NaiveDateTime>,
    pub result: Option<bool>,
    pub score_home: Option<i32>,
    pub score_away: Option<i32>,
    pub selections: Option<Vec<UserId>>,
}

impl MatchPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(home_id) = self.home_id {
            validate_team_id("home_id", home_id)?;
        }
        if let Some(away_id) = self.away_id {
            validate_team_id("away_id", away_id)?;
        }
        if let Some(score) = self.score_home {
            validate_score("score_home", score)?;
        }
        if let Some(score) = self.score_away {
            validate_score("score_away", score)?;
        }
        if let Some(selections) = &self.selections {
            validate_selections(selections)?;
        }
        Ok(())
    }

    pub fn has_scalar_changes(&self) -> bool {
        self.home_id.is_some()
            || self.away_id.is_some()
            || self.start_time.is_some()
            || self.result.is_some()
            || self.score_home.is_some()
            || self.score_away.is_some()
    }

    /// Overlay the patch onto the stored fields
    pub fn merge_onto(&self, stored: MatchFields) -> MatchFields {
        MatchFields {
            home_id: self.home_id.unwrap_or(stored.home_id),
            away_id: self.away_id.unwrap_or(stored.away_id),
            start_time: self.start_time.unwrap_or(stored.start_time),
            result: self.result.unwrap_or(stored.result),
            score_home: self.score_home.unwrap_or(stored.score_home),
            score_away: self.score_away.unwrap_or(stored.score_away),
        }
    }
}

fn validate_team_id(name: &str, id: TeamId) -> Result<(), String> {
    if id < 1 {
        return Err(format!("Invalid {} value", name));
    }
    Ok(())
}

fn validate_score(name: &str, score: i32) -> Result<(), String> {
    if score < 0 {
        return Err(format!("Invalid {} value", name));
    }
    Ok(())
}

pub fn validate_different_teams(home_id: TeamId, away_id: TeamId) -> Result<(), String> {
    if home_id == away_id {
        return Err("Home and away teams must be different".to_string());
    }
    Ok(())
}

fn validate_selections(selections: &[UserId]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for &user_id in selections {
        if user_id < 1 {
            return Err(format!("Invalid selections value: {}", user_id));
        }
        if !seen.insert(user_id) {
            return Err(format!("Duplicate selections value: {}", user_id));
        }
    }
    Ok(())
}

/// A selected player's availability for a match.
///
/// Stored as an integer in `selections.confirmed`. `None` is only ever set
/// by (re-)selection, never by a confirmation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum ConfirmationStatus {
    None = 0,
    NotAvailable = 1,
    Maybe = 2,
    Confirmed = 3,
}

impl ConfirmationStatus {
    /// Whether the player still owes an answer
    pub fn is_pending(&self) -> bool {
        matches!(self, ConfirmationStatus::None | ConfirmationStatus::Maybe)
    }
}

impl Default for ConfirmationStatus {
    fn default() -> Self {
        ConfirmationStatus::None
    }
}

impl Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfirmationStatus::None => "NONE",
            ConfirmationStatus::NotAvailable => "NOT_AVAILABLE",
            ConfirmationStatus::Maybe => "MAYBE",
            ConfirmationStatus::Confirmed => "CONFIRMED",
        };
        write!(f, "{}", label)
    }
}

/// How a manager changes a player's place in the squad
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionChoice {
    Yes,
    No,
    Toggle,
}

impl FromStr for SelectionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(SelectionChoice::Yes),
            "n" | "no" => Ok(SelectionChoice::No),
            "t" | "toggle" => Ok(SelectionChoice::Toggle),
            "m" | "maybe" => Err("'maybe' is not a valid selection choice".to_string()),
            other => Err(format!("Invalid selection choice: '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for SelectionChoice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A selected player's answer about their availability
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationChoice {
    Yes,
    No,
    Maybe,
}

impl FromStr for ConfirmationChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(ConfirmationChoice::Yes),
            "n" | "no" => Ok(ConfirmationChoice::No),
            "m" | "maybe" => Ok(ConfirmationChoice::Maybe),
            "t" | "toggle" => Err("'toggle' is not a valid confirmation choice".to_string()),
            other => Err(format!("Invalid confirmation choice: '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for ConfirmationChoice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome of a selection change
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    Added,
    Removed,
    Unchanged,
}

/// Comparison applied to the calendar date of a fixture's kickoff
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Before,
    BeforeOrEqual,
    Equal,
    AfterOrEqual,
    After,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate, reference: NaiveDate) -> bool {
        match self {
            DateRange::Before => date < reference,
            DateRange::BeforeOrEqual => date <= reference,
            DateRange::Equal => date == reference,
            DateRange::AfterOrEqual => date >= reference,
            DateRange::After => date > reference,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            DateRange::Before => "<",
            DateRange::BeforeOrEqual => "<=",
            DateRange::Equal => "=",
            DateRange::AfterOrEqual => ">=",
            DateRange::After => ">",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MatchOrder {
    #[serde(rename = "date_asc")]
    DateAsc,
    #[serde(rename = "date_desc")]
    DateDesc,
}

/// Query parameters for listing matches
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MatchFilter {
    pub team: Option<TeamId>,
    pub opposition: Option<TeamId>,
    pub date_range: Option<DateRange>,
    pub date: Option<NaiveDate>,
    pub order: Option<MatchOrder>,
}

impl MatchFilter {
    /// Date criterion, only applied when both range and date are given
    pub fn date_criterion(&self) -> Option<(DateRange, NaiveDate)> {
        match (self.date_range, self.date) {
            (Some(range), Some(date)) => Some((range, date)),
            _ => None,
        }
    }

    pub fn matches(&self, record: &MatchRecord) -> bool {
        if let Some(team) = self.team {
            if !record.involves(team) {
                return false;
            }
        }
        if let Some(opposition) = self.opposition {
            if !record.involves(opposition) {
                return false;
            }
        }
        if let Some((range, date)) = self.date_criterion() {
            if !range.contains(record.start_time.date(), date) {
                return false;
            }
        }
        true
    }
}

/// A fixture the player is selected for but has not firmly answered
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PendingFixture {
    pub match_id: MatchId,
    #[serde(with = "kickoff")]
    pub start_time: NaiveDateTime,
    pub home_id: TeamId,
    pub away_id: TeamId,
    pub confirmed: ConfirmationStatus,
}

/// Selection state of one player for one match
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SelectionStatus {
    pub selected: bool,
    pub confirmed: Option<ConfirmationStatus>,
}

/// Kickoff timestamps: ISO-8601 with or without seconds, or RFC 3339 with an offset
pub mod kickoff {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const WITHOUT_SECONDS: &str = "%Y-%m-%dT%H:%M";

    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        let raw = raw.trim();
        if let Ok(value) = raw.parse::<NaiveDateTime>() {
            return Ok(value);
        }
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, WITHOUT_SECONDS) {
            return Ok(value);
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|value| value.naive_utc())
            .map_err(|_| format!("Invalid start_time value: '{}'", raw))
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
