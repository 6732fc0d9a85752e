//! Application state and service initialization
//!
//! This module centralizes service construction so the HTTP server and
//! tests build the pipeline the same way.

use std::sync::Arc;

use crate::fetcher::{MatchPageFetcher, PageRenderer, renderer_from_config};
use crate::model::{Config, ConfigError};
use crate::service::{ArchiveWriter, LlmClient, ReportAgent, ReportModel, ReportPipeline};

/// Application state shared by all handlers
pub struct AppState {
    /// URL-to-archive report pipeline
    pub pipeline: Arc<ReportPipeline>,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. LLM client initialization (requires OPENAI_API_KEY)
    /// 2. Renderer selection (browser service or plain HTTP)
    /// 3. Pipeline construction
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(AppError::MissingConfig("OPENAI_API_KEY"))?;

        let llm_client = LlmClient::new(
            api_key,
            &config.agent.model,
            config.agent.base_url.as_deref(),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create LLM client");
            AppError::InvalidConfig("OPENAI_API_KEY or OPENAI_BASE_URL")
        })?;

        Self::with_components(
            config,
            renderer_from_config(&config.fetcher),
            Arc::new(llm_client),
        )
    }

    /// Build application state around an explicit renderer and model
    pub fn with_components(
        config: &Config,
        renderer: Arc<dyn PageRenderer>,
        model: Arc<dyn ReportModel>,
    ) -> Result<Self, AppError> {
        let fetcher = MatchPageFetcher::new(config.fetcher.clone(), renderer)?;
        let agent = ReportAgent::new(model, config.agent.clone());
        let archive = ArchiveWriter::new(config.output_dir.clone());

        tracing::info!(
            mode = ?config.mode,
            output_dir = %config.output_dir.display(),
            model = %config.agent.model,
            "Report pipeline ready"
        );

        let pipeline = ReportPipeline::new(
            fetcher,
            agent,
            archive,
            config.fetcher.retry,
            config.fetcher.max_context_chars,
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Server could not start
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
