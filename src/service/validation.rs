//! Validation of normalized fields and model output
//!
//! `validate_match` is the only constructor of [`MatchRecord`]; a record
//! that exists is known to carry both teams and the final score.

use std::fmt;

use crate::model::{FieldValue, GeneratedReport, MatchContext, MatchRecord, NormalizedFields};

/// Replies starting with one of these are treated as refusals
const REFUSAL_PREFIXES: &[&str] = &[
    "i'm sorry",
    "i am sorry",
    "i cannot",
    "i can't",
    "as an ai",
];

/// Field a violation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    HomeTeam,
    AwayTeam,
    FinalScore,
    Competition,
    KickoffTime,
    Event(usize),
    Narrative,
    ModelVerdict,
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::HomeTeam => f.write_str("home_team"),
            FieldName::AwayTeam => f.write_str("away_team"),
            FieldName::FinalScore => f.write_str("final_score"),
            FieldName::Competition => f.write_str("competition"),
            FieldName::KickoffTime => f.write_str("kickoff_time"),
            FieldName::Event(index) => write!(f, "events[{}]", index),
            FieldName::Narrative => f.write_str("narrative"),
            FieldName::ModelVerdict => f.write_str("is_valid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    Missing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: FieldName,
    pub kind: ViolationKind,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{} is missing", self.field),
            ViolationKind::Invalid(reason) => write!(f, "{} is invalid: {}", self.field, reason),
        }
    }
}

/// Every problem that prevented a record or report from being accepted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", describe(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Fields that were absent altogether
    pub fn missing_fields(&self) -> Vec<FieldName> {
        self.violations
            .iter()
            .filter(|v| v.kind == ViolationKind::Missing)
            .map(|v| v.field)
            .collect()
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates errors and warnings while checking one input
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<FieldViolation>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: FieldName, kind: ViolationKind) {
        self.errors.push(FieldViolation { field, kind });
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            violations: self.errors,
        }
    }
}

fn required<T: Clone>(
    value: &FieldValue<T>,
    field: FieldName,
    result: &mut ValidationResult,
) -> Option<T> {
    match value {
        FieldValue::Present(v) => Some(v.clone()),
        FieldValue::Missing => {
            result.add_error(field, ViolationKind::Missing);
            None
        }
        FieldValue::Invalid { reason, .. } => {
            result.add_error(field, ViolationKind::Invalid(reason.clone()));
            None
        }
    }
}

fn optional<T: Clone>(
    value: &FieldValue<T>,
    field: FieldName,
    result: &mut ValidationResult,
) -> Option<T> {
    match value {
        FieldValue::Present(v) => Some(v.clone()),
        FieldValue::Missing => None,
        FieldValue::Invalid { raw, reason } => {
            result.add_warning(format!("Dropping {} '{}': {}", field, raw, reason));
            None
        }
    }
}

/// Build a [`MatchRecord`] from normalized fields
///
/// Checks:
/// 1. Home team, away team and final score are present and well formed
/// 2. The two teams differ
/// 3. Optional fields that failed to parse are dropped with a warning
pub fn validate_match(fields: &NormalizedFields) -> Result<MatchRecord, ValidationError> {
    let mut result = ValidationResult::default();

    let home_team = required(&fields.home_team, FieldName::HomeTeam, &mut result);
    let away_team = required(&fields.away_team, FieldName::AwayTeam, &mut result);
    let final_score = required(&fields.final_score, FieldName::FinalScore, &mut result);

    if let (Some(home), Some(away)) = (&home_team, &away_team)
        && home.to_lowercase() == away.to_lowercase()
    {
        result.add_error(
            FieldName::AwayTeam,
            ViolationKind::Invalid(format!("same as home team '{}'", home)),
        );
    }

    let competition = optional(&fields.competition, FieldName::Competition, &mut result);
    let kickoff_time = optional(&fields.kickoff_time, FieldName::KickoffTime, &mut result);
    let events = fields
        .events
        .iter()
        .enumerate()
        .filter_map(|(i, event)| optional(event, FieldName::Event(i), &mut result))
        .collect();

    for warning in &result.warnings {
        tracing::warn!(warning = %warning, "Match record warning");
    }

    match (home_team, away_team, final_score) {
        (Some(home), Some(away), Some(score)) if result.is_valid() => Ok(MatchRecord::new(
            home,
            away,
            score,
            competition,
            kickoff_time,
            events,
            fields.source_url.clone(),
            MatchContext {
                page_text: fields.page_text.clone(),
                stats_text: fields.stats_text.clone(),
            },
        )),
        _ => Err(result.into_error()),
    }
}

/// Check structured model output against the record it was generated for
///
/// Returns the trimmed narrative on success. Score agreement is checked
/// separately by the consistency checker.
pub fn validate_generated(
    generated: &GeneratedReport,
    record: &MatchRecord,
) -> Result<String, ValidationError> {
    let mut result = ValidationResult::default();
    let narrative = generated.narrative.trim();

    if !generated.is_valid {
        result.add_error(
            FieldName::ModelVerdict,
            ViolationKind::Invalid("model reported the facts as unusable".to_string()),
        );
    }

    if narrative.is_empty() {
        result.add_error(FieldName::Narrative, ViolationKind::Missing);
    } else {
        let lowered = narrative.to_lowercase();
        if REFUSAL_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            result.add_error(
                FieldName::Narrative,
                ViolationKind::Invalid("reply is a refusal".to_string()),
            );
        }
    }

    let echoes = [
        (FieldName::HomeTeam, &generated.home_team, record.home_team()),
        (FieldName::AwayTeam, &generated.away_team, record.away_team()),
    ];
    for (field, echoed, expected) in echoes {
        if let Some(echoed) = echoed
            && echoed.trim().to_lowercase() != expected.to_lowercase()
        {
            result.add_error(
                field,
                ViolationKind::Invalid(format!("expected '{}', got '{}'", expected, echoed)),
            );
        }
    }

    if !result.is_valid() {
        return Err(result.into_error());
    }
    Ok(narrative.to_string())
}
