//! Shared LLM client and interaction utilities
//!
//! [`ReportModel`] is the seam between the report agent and the language
//! model. [`LlmClient`] implements it with a rig-core extractor over the
//! OpenAI API, so replies arrive already deserialized as [`GeneratedReport`].

use async_trait::async_trait;
use reqwest::StatusCode;
use rig::client::CompletionClient;
use rig::completion::CompletionError;
use rig::extractor::ExtractionError;
use rig::providers::openai;
use serde::Deserialize;
use serde_json::json;

use crate::model::GeneratedReport;

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ModelError {
    #[error("Model call timed out")]
    Timeout,

    #[error("Rate limited by model provider")]
    RateLimited,

    #[error("Malformed model response: {0}")]
    Malformed(String),

    #[error("Model provider unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected by model provider: {0}")]
    Rejected(String),
}

/// A single extraction request
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Language model able to produce a [`GeneratedReport`]
#[async_trait]
pub trait ReportModel: Send + Sync {
    /// Run one extraction and return the structured reply
    async fn generate(&self, request: &ModelRequest) -> Result<GeneratedReport, ModelError>;

    fn model_name(&self) -> &str;
}

/// Shared LLM client wrapper
#[derive(Clone)]
pub struct LlmClient {
    client: openai::Client,
    model: String,
}

impl LlmClient {
    /// Create a new LLM client with the provided API key
    ///
    /// `base_url` points the client at an OpenAI-compatible server instead
    /// of api.openai.com.
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Result<Self, String> {
        if api_key.trim().is_empty() {
            return Err("OpenAI API key is empty".to_string());
        }

        let mut builder = openai::Client::builder(api_key);
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url);
        }
        let client = builder
            .build()
            .map_err(|e| format!("Failed to create OpenAI client: {}", e))?;

        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ReportModel for LlmClient {
    async fn generate(&self, request: &ModelRequest) -> Result<GeneratedReport, ModelError> {
        let start_time = std::time::Instant::now();
        let prompt_length = request.prompt.len();

        let extractor = self
            .client
            .extractor::<GeneratedReport>(&self.model)
            .preamble(&request.system)
            .additional_params(json!({ "temperature": request.temperature }))
            .build();

        match extractor.extract(request.prompt.as_str()).await {
            Ok(generated) => {
                tracing::info!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length,
                    "OpenAI API call for match report completed successfully"
                );
                Ok(generated)
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length,
                    error = %e,
                    "OpenAI API call for match report failed"
                );
                Err(classify_extraction_error(e))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn classify_extraction_error(error: ExtractionError) -> ModelError {
    match error {
        ExtractionError::NoData => ModelError::Malformed("model submitted no report".to_string()),
        ExtractionError::DeserializationError(e) => {
            ModelError::Malformed(format!("report does not match schema: {}", e))
        }
        ExtractionError::CompletionError(e) => classify_completion_error(e),
    }
}

fn classify_completion_error(error: CompletionError) -> ModelError {
    match error {
        CompletionError::HttpError(e) if e.is_timeout() => ModelError::Timeout,
        CompletionError::HttpError(e) if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) => {
            ModelError::RateLimited
        }
        CompletionError::HttpError(e) => ModelError::Unavailable(e.to_string()),
        CompletionError::JsonError(e) => ModelError::Malformed(e.to_string()),
        CompletionError::ResponseError(msg) => ModelError::Malformed(msg),
        CompletionError::ProviderError(body) => classify_provider_error(&body),
        other => ModelError::Rejected(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map an error body returned by the provider
fn classify_provider_error(body: &str) -> ModelError {
    let Ok(parsed) = serde_json::from_str::<ProviderErrorBody>(body) else {
        let detail: String = body.chars().take(300).collect();
        return ModelError::Unavailable(detail);
    };

    let detail = parsed.error;
    let code = detail.code.as_deref().unwrap_or_default();
    let kind = detail.kind.as_deref().unwrap_or_default();

    if code == "rate_limit_exceeded" || kind == "rate_limit_error" {
        return ModelError::RateLimited;
    }
    match (code, kind) {
        ("insufficient_quota" | "invalid_api_key" | "model_not_found", _)
        | (_, "invalid_request_error" | "authentication_error" | "insufficient_quota") => {
            ModelError::Rejected(detail.message)
        }
        _ => ModelError::Unavailable(detail.message),
    }
}
