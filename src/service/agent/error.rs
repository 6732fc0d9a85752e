//! Error types for report generation

use std::time::Duration;

use thiserror::Error;

use crate::model::Score;
use crate::service::llm::ModelError;

/// Error type for report generation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    #[error("Model did not answer within {0:?}")]
    ModelTimeout(Duration),

    #[error("Rate limited by model provider")]
    RateLimited,

    #[error("Model output could not be used: {0}")]
    MalformedOutput(String),

    #[error("Narrative score does not match the final score {expected} (found {})", format_scores(.found))]
    ConsistencyMismatch { expected: Score, found: Vec<Score> },

    #[error("Model provider unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model provider rejected the request: {0}")]
    Rejected(String),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<AgentError> },
}

impl AgentError {
    /// Whether another model call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgentError::ModelTimeout(_)
                | AgentError::RateLimited
                | AgentError::MalformedOutput(_)
                | AgentError::ConsistencyMismatch { .. }
                | AgentError::ModelUnavailable(_)
        )
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::ModelTimeout(_) => "model_timeout",
            AgentError::RateLimited => "rate_limited",
            AgentError::MalformedOutput(_) => "malformed_output",
            AgentError::ConsistencyMismatch { .. } => "consistency_mismatch",
            AgentError::ModelUnavailable(_) => "model_unavailable",
            AgentError::Rejected(_) => "rejected",
            AgentError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }

    pub(crate) fn from_model(error: ModelError, timeout: Duration) -> Self {
        match error {
            ModelError::Timeout => AgentError::ModelTimeout(timeout),
            ModelError::RateLimited => AgentError::RateLimited,
            ModelError::Malformed(reason) => AgentError::MalformedOutput(reason),
            ModelError::Unavailable(reason) => AgentError::ModelUnavailable(reason),
            ModelError::Rejected(reason) => AgentError::Rejected(reason),
        }
    }
}

fn format_scores(scores: &[Score]) -> String {
    if scores.is_empty() {
        return "no score".to_string();
    }
    scores
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
