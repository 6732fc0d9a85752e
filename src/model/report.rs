use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;

use super::record::{MatchEvent, MatchRecord, Score};
use super::statistics::MatchStatistics;

/// Language the narrative is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "cs")]
    Czech,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Czech => "cs",
        }
    }

    /// Instruction appended to the prompt
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::English => "Write the report in English.",
            Language::Czech => "Write the report in Czech.",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "cs" | "czech" => Ok(Language::Czech),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Structured output requested from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedReport {
    /// False when the supplied facts do not describe a football match
    #[serde(default = "default_true")]
    pub is_valid: bool,
    /// Home team name exactly as given in the facts
    #[serde(default)]
    pub home_team: Option<String>,
    /// Away team name exactly as given in the facts
    #[serde(default)]
    pub away_team: Option<String>,
    /// Final score as written in the narrative, home goals first, e.g. "2:1"
    #[serde(default)]
    pub final_score: Option<String>,
    /// Statistics stated on the match or statistics page
    #[serde(default)]
    pub statistics: Option<MatchStatistics>,
    /// The match report
    pub narrative: String,
}

fn default_true() -> bool {
    true
}

/// Final, consistency-checked report
#[derive(Debug, Clone)]
pub struct Report {
    narrative_text: String,
    source_record: Arc<MatchRecord>,
    generated_at: DateTime<Utc>,
    language: Language,
    attempts: u32,
    statistics: Option<MatchStatistics>,
}

impl Report {
    pub(crate) fn new(
        narrative_text: String,
        source_record: Arc<MatchRecord>,
        generated_at: DateTime<Utc>,
        language: Language,
        attempts: u32,
    ) -> Self {
        Self {
            narrative_text,
            source_record,
            generated_at,
            language,
            attempts,
            statistics: None,
        }
    }

    /// Attach model-reported statistics, dropping an all-empty object
    pub(crate) fn with_statistics(mut self, statistics: Option<MatchStatistics>) -> Self {
        self.statistics = statistics.filter(|stats| !stats.is_empty());
        self
    }

    pub fn narrative_text(&self) -> &str {
        &self.narrative_text
    }

    pub fn source_record(&self) -> &MatchRecord {
        &self.source_record
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Number of model calls it took to produce this report
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn statistics(&self) -> Option<&MatchStatistics> {
        self.statistics.as_ref()
    }
}

/// JSON document written to the archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivePayload {
    pub home_team: String,
    pub away_team: String,
    pub final_score: Score,
    pub final_score_text: String,
    pub narrative_text: String,
    pub generated_at: DateTime<Utc>,
    pub saved_at_utc: String,
    pub language: Language,
    pub competition: Option<String>,
    pub kickoff_time: Option<DateTime<Utc>>,
    pub events: Vec<MatchEvent>,
    pub source_url: Option<String>,
    pub attempts: u32,
    pub statistics: Option<MatchStatistics>,
}

impl ArchivePayload {
    pub fn from_report(report: &Report, saved_at_utc: String) -> Self {
        let record = report.source_record();
        Self {
            home_team: record.home_team().to_string(),
            away_team: record.away_team().to_string(),
            final_score: record.final_score(),
            final_score_text: record.final_score().to_string(),
            narrative_text: report.narrative_text().to_string(),
            generated_at: report.generated_at(),
            saved_at_utc,
            language: report.language(),
            competition: record.competition().map(str::to_string),
            kickoff_time: record.kickoff_time(),
            events: record.events().to_vec(),
            source_url: record.source_url().map(|url| url.to_string()),
            attempts: report.attempts(),
            statistics: report.statistics().cloned(),
        }
    }
}

/// Persisted form of a report
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub filename: String,
    pub path: PathBuf,
    pub payload: ArchivePayload,
}

/// Result of a successful pipeline run
#[derive(Debug, Clone)]
pub struct ArchivedReport {
    pub report: Report,
    pub archive: ArchiveEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!("cs".parse::<Language>().unwrap(), Language::Czech);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert!("de".parse::<Language>().is_err());
        assert_eq!(serde_json::to_string(&Language::Czech).unwrap(), "\"cs\"");
    }

    #[test]
    fn test_generated_report_defaults() {
        let parsed: GeneratedReport =
            serde_json::from_str(r#"{"narrative": "Bohemians won 2:1."}"#).unwrap();
        assert!(parsed.is_valid);
        assert!(parsed.final_score.is_none());
        assert!(parsed.statistics.is_none());
        assert_eq!(parsed.narrative, "Bohemians won 2:1.");
    }

    #[test]
    fn test_generated_report_requires_narrative() {
        assert!(serde_json::from_str::<GeneratedReport>(r#"{"is_valid": true}"#).is_err());
    }
}
