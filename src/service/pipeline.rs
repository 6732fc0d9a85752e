//! End-to-end report pipeline
//!
//! URL → fetch → normalize → validate → generate → persist. Each stage
//! either hands a value to the next or stops the run with a typed error;
//! nothing is persisted for a run that fails.

use std::path::Path;
use std::sync::Arc;

use crate::fetcher::{FetchError, MatchPageFetcher};
use crate::model::{ArchivedReport, Language, RawFragment, RetryPolicy};
use crate::service::agent::{AgentError, ReportAgent};
use crate::service::archive::{ArchiveWriter, StorageError};
use crate::service::normalizer::normalize;
use crate::service::validation::{ValidationError, validate_match};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Match data rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Report generation failed: {0}")]
    Agent(#[from] AgentError),

    #[error("Archiving failed: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Stage that produced the error, for logs
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Validation(_) => "validate",
            PipelineError::Agent(_) => "generate",
            PipelineError::Storage(_) => "persist",
        }
    }
}

/// Runs the full URL-to-archive flow
pub struct ReportPipeline {
    fetcher: MatchPageFetcher,
    agent: ReportAgent,
    archive: ArchiveWriter,
    fetch_retry: RetryPolicy,
    context_chars: usize,
}

impl ReportPipeline {
    pub fn new(
        fetcher: MatchPageFetcher,
        agent: ReportAgent,
        archive: ArchiveWriter,
        fetch_retry: RetryPolicy,
        context_chars: usize,
    ) -> Self {
        Self {
            fetcher,
            agent,
            archive,
            fetch_retry,
            context_chars,
        }
    }

    pub fn default_language(&self) -> Language {
        self.agent.default_language()
    }

    pub fn archive_dir(&self) -> &Path {
        self.archive.dir()
    }

    pub fn renderer_name(&self) -> &'static str {
        self.fetcher.renderer_name()
    }

    pub fn model_name(&self) -> &str {
        self.agent.model_name()
    }

    /// Produce and archive a report for a match page URL
    pub async fn generate_report(
        &self,
        url: &str,
        language: Language,
    ) -> Result<ArchivedReport, PipelineError> {
        tracing::info!(url = %url, language = %language, "Starting report pipeline");

        let fragment = self.fetch_with_retry(url).await.inspect_err(|e| {
            tracing::warn!(url = %url, error = %e, "Match page fetch failed");
        })?;

        self.generate_from_fragment(&fragment, language).await
    }

    /// Run every stage after fetching on an already extracted fragment
    pub async fn generate_from_fragment(
        &self,
        fragment: &RawFragment,
        language: Language,
    ) -> Result<ArchivedReport, PipelineError> {
        let fields = normalize(fragment, self.context_chars);

        let record = validate_match(&fields).inspect_err(|e| {
            tracing::warn!(
                url = ?fragment.source_url,
                missing = ?e.missing_fields(),
                error = %e,
                "Match record failed validation, no report generated"
            );
        })?;
        let record = Arc::new(record);

        tracing::info!(
            home = %record.home_team(),
            away = %record.away_team(),
            score = %record.final_score(),
            events = record.events().len(),
            "Match record validated"
        );

        let report = self.agent.generate(record, language).await?;
        let archive = self.archive.persist(&report).await?;

        Ok(ArchivedReport { report, archive })
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<RawFragment, FetchError> {
        let max_attempts = self.fetch_retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetcher.fetch(url).await {
                Ok(fragment) => return Ok(fragment),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.fetch_retry.delay_after(attempt);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
