//! Structured match statistics reported by the model
//!
//! Every field is optional: the model fills only what the match page or the
//! statistics page actually states.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

/// A numeric statistic for both teams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default)]
pub struct TeamCounts {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

/// Ball possession as shown on the page, e.g. "54%"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default)]
pub struct Possession {
    pub home: Option<String>,
    pub away: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Goal,
    PenaltyGoal,
    OwnGoal,
    DisallowedGoal,
}

/// Goal-like timeline entry, including disallowed goals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default)]
pub struct GoalEvent {
    /// Minute as shown on the page, e.g. "12" or "45+2"
    pub minute: Option<String>,
    pub team: Option<Side>,
    pub scorer: Option<String>,
    pub assist: Option<String>,
    pub kind: Option<GoalKind>,
    /// Whether the goal counted in the official score
    pub counted: Option<bool>,
    /// Extra detail, e.g. "VAR offside"
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Yellow,
    Red,
    SecondYellow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default)]
pub struct CardEvent {
    pub minute: Option<String>,
    pub team: Option<Side>,
    pub player: Option<String>,
    pub card: Option<CardKind>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KickOutcome {
    Scored,
    Missed,
    Saved,
    Post,
    Unknown,
}

/// One kick of a penalty shootout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default)]
pub struct ShootoutKick {
    /// Kick order, starting at 1
    pub order: Option<u32>,
    pub team: Option<Side>,
    pub taker: Option<String>,
    pub outcome: Option<KickOutcome>,
    pub note: Option<String>,
}

/// Match statistics extracted alongside the narrative
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default)]
pub struct MatchStatistics {
    pub possession: Possession,
    pub shots: TeamCounts,
    pub yellow_cards: TeamCounts,
    pub red_cards: TeamCounts,
    pub substitutions: TeamCounts,

    pub went_to_extra_time: Option<bool>,
    /// Score after regular time, e.g. "1:1"
    pub score_after_90: Option<String>,
    /// Score after extra time, e.g. "2:2"
    pub score_after_extra_time: Option<String>,

    /// Penalties awarded in open play
    pub penalties_awarded: TeamCounts,
    pub penalties_scored: TeamCounts,
    pub penalties_missed: TeamCounts,

    pub has_penalty_shootout: Option<bool>,
    /// Shootout score, home first, e.g. "4:3"
    pub penalty_shootout_score: Option<String>,
    pub penalty_shootout_kicks: Vec<ShootoutKick>,

    /// Goal timeline, disallowed goals included
    pub goals: Vec<GoalEvent>,
    pub cards: Vec<CardEvent>,
    pub disallowed_goals_count: Option<u32>,
    pub disallowed_goals: Vec<GoalEvent>,

    /// Anything notable not captured above, e.g. VAR incidents
    pub notes: Option<String>,
}

impl MatchStatistics {
    /// True when the model reported nothing at all
    pub fn is_empty(&self) -> bool {
        *self == MatchStatistics::default()
    }
}
