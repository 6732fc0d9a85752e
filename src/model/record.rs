use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Final score, home team first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.home, self.away)
    }
}

/// Outcome of normalizing a single field
///
/// Normalization never fails as a whole: a field that could not be coerced
/// is kept as `Invalid` so the validator can report every problem at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Missing,
    Invalid { raw: String, reason: String },
    Present(T),
}

impl<T> FieldValue<T> {
    pub fn invalid(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldValue::Invalid {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

impl<T> Default for FieldValue<T> {
    fn default() -> Self {
        FieldValue::Missing
    }
}

/// A timeline entry (goal, card, substitution...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: u32,
    /// Stoppage time, e.g. `2` for "45+2'"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_time: Option<u32>,
    pub description: String,
}

impl MatchEvent {
    /// Minute as shown on match pages: `12'`, `45+2'`
    pub fn minute_label(&self) -> String {
        match self.added_time {
            Some(added) => format!("{}+{}'", self.minute, added),
            None => format!("{}'", self.minute),
        }
    }
}

/// Typed but not yet validated fields of one match page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFields {
    pub source_url: Option<Url>,
    pub home_team: FieldValue<String>,
    pub away_team: FieldValue<String>,
    pub final_score: FieldValue<Score>,
    pub competition: FieldValue<String>,
    pub kickoff_time: FieldValue<DateTime<Utc>>,
    pub events: Vec<FieldValue<MatchEvent>>,
    pub page_text: Option<String>,
    pub stats_text: Option<String>,
}

/// Background text handed to the model alongside the record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchContext {
    pub page_text: Option<String>,
    pub stats_text: Option<String>,
}

/// Validated facts of a single match
///
/// Only the record validator constructs this type, so holding one means
/// every mandatory field passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    home_team: String,
    away_team: String,
    final_score: Score,
    competition: Option<String>,
    kickoff_time: Option<DateTime<Utc>>,
    events: Vec<MatchEvent>,
    source_url: Option<Url>,
    context: MatchContext,
}

impl MatchRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        home_team: String,
        away_team: String,
        final_score: Score,
        competition: Option<String>,
        kickoff_time: Option<DateTime<Utc>>,
        events: Vec<MatchEvent>,
        source_url: Option<Url>,
        context: MatchContext,
    ) -> Self {
        Self {
            home_team,
            away_team,
            final_score,
            competition,
            kickoff_time,
            events,
            source_url,
            context,
        }
    }

    pub fn home_team(&self) -> &str {
        &self.home_team
    }

    pub fn away_team(&self) -> &str {
        &self.away_team
    }

    pub fn final_score(&self) -> Score {
        self.final_score
    }

    pub fn competition(&self) -> Option<&str> {
        self.competition.as_deref()
    }

    pub fn kickoff_time(&self) -> Option<DateTime<Utc>> {
        self.kickoff_time
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn source_url(&self) -> Option<&Url> {
        self.source_url.as_ref()
    }

    pub fn context(&self) -> &MatchContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_display() {
        assert_eq!(Score::new(2, 1).to_string(), "2:1");
    }

    #[test]
    fn test_minute_label() {
        let regular = MatchEvent {
            minute: 12,
            added_time: None,
            description: "Goal".to_string(),
        };
        let stoppage = MatchEvent {
            minute: 45,
            added_time: Some(2),
            description: "Yellow card".to_string(),
        };
        assert_eq!(regular.minute_label(), "12'");
        assert_eq!(stoppage.minute_label(), "45+2'");
    }

    #[test]
    fn test_field_value_constructors() {
        let invalid: FieldValue<u32> = FieldValue::invalid("x", "not a number");
        assert_eq!(
            invalid,
            FieldValue::Invalid {
                raw: "x".to_string(),
                reason: "not a number".to_string()
            }
        );
        assert_eq!(FieldValue::<u32>::default(), FieldValue::Missing);
    }
}
