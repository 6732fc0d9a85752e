//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::fetcher::FetchError;
use crate::service::{PipelineError, StorageError};

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// URL is not a supported match page (400)
    #[error("{0}")]
    UnsupportedUrl(String),

    /// Page data is incomplete or inconsistent (422)
    #[error("{0}")]
    UnprocessableMatch(String),

    /// A report with the same archive name already exists (409)
    #[error("{0}")]
    Conflict(String),

    /// Page rendering or model provider failed (502)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UnsupportedUrl(_) => "unsupported_url",
            ApiError::UnprocessableMatch(_) => "unprocessable_match",
            ApiError::Conflict(_) => "archive_conflict",
            ApiError::ExternalService(_) => "external_service_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnsupportedUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::UnprocessableMatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = self.error_type();

        if status.is_server_error() {
            tracing::error!(error_type, status = status.as_u16(), message = %self, "API error");
        } else {
            tracing::warn!(error_type, status = status.as_u16(), message = %self, "API error");
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
        })
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::Fetch(FetchError::UnsupportedUrl(_)) => ApiError::UnsupportedUrl(message),
            PipelineError::Fetch(FetchError::MissingElement { .. })
            | PipelineError::Validation(_) => ApiError::UnprocessableMatch(message),
            PipelineError::Fetch(_) | PipelineError::Agent(_) => ApiError::ExternalService(message),
            PipelineError::Storage(StorageError::Collision(_)) => ApiError::Conflict(message),
            PipelineError::Storage(_) => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::model::Slot;
    use crate::service::agent::AgentError;
    use crate::service::validation::ValidationError;

    #[test]
    fn test_pipeline_error_status_mapping() {
        let cases = [
            (
                PipelineError::Fetch(FetchError::UnsupportedUrl("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::Fetch(FetchError::MissingElement {
                    slot: Slot::Score,
                    selector: ".detailScore__wrapper".into(),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PipelineError::Validation(ValidationError { violations: vec![] }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PipelineError::Fetch(FetchError::Timeout(Duration::from_secs(1))),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::Agent(AgentError::RateLimited),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::Storage(StorageError::Collision(PathBuf::from("a.json"))),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }
}
