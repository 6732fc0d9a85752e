//! Report generation agent
//!
//! Drives a bounded loop of model calls for one validated record. Each reply
//! is validated and checked for score consistency before it becomes a
//! [`Report`]. Transient failures are retried with backoff up to the
//! configured attempt limit. Only the attempt counter and the original request
//! carry over between attempts; earlier replies are discarded.

use std::sync::Arc;

use chrono::Utc;

use crate::model::{AgentConfig, GeneratedReport, Language, MatchRecord, Report};
use crate::service::agent::consistency::check_score;
use crate::service::agent::prompts::{REPORT_SYSTEM_PROMPT, build_report_prompt};
use crate::service::llm::{ModelRequest, ReportModel};
use crate::service::validation::validate_generated;

pub mod consistency;
pub mod error;
pub mod prompts;

pub use error::AgentError;

/// States of a single generation run
#[derive(Debug)]
enum AgentState {
    Building,
    AwaitingModel {
        attempt: u32,
        request: Arc<ModelRequest>,
    },
    Validating {
        attempt: u32,
        request: Arc<ModelRequest>,
        reply: GeneratedReport,
    },
    Retrying {
        attempt: u32,
        request: Arc<ModelRequest>,
        reason: AgentError,
    },
    Done(Report),
    Failed(AgentError),
}

/// Generates narrative reports from validated match records
pub struct ReportAgent {
    model: Arc<dyn ReportModel>,
    config: AgentConfig,
}

impl ReportAgent {
    pub fn new(model: Arc<dyn ReportModel>, config: AgentConfig) -> Self {
        tracing::info!(
            model = %model.model_name(),
            max_attempts = config.retry.max_attempts,
            timeout_ms = config.model_timeout_ms,
            "Report agent initialized"
        );
        Self { model, config }
    }

    pub fn default_language(&self) -> Language {
        self.config.default_language
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Generate a report for a record
    ///
    /// Makes at most `retry.max_attempts` model calls. Non-transient errors
    /// stop the loop immediately.
    pub async fn generate(
        &self,
        record: Arc<MatchRecord>,
        language: Language,
    ) -> Result<Report, AgentError> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut state = AgentState::Building;

        loop {
            state = match state {
                AgentState::Building => AgentState::AwaitingModel {
                    attempt: 1,
                    request: Arc::new(self.build_request(&record, language)),
                },

                AgentState::AwaitingModel { attempt, request } => {
                    tracing::debug!(attempt, max_attempts, "Requesting report from model");
                    match self.call_model(&request).await {
                        Ok(reply) => AgentState::Validating {
                            attempt,
                            request,
                            reply,
                        },
                        Err(e) => Self::after_failure(attempt, max_attempts, request, e),
                    }
                }

                AgentState::Validating {
                    attempt,
                    request,
                    reply,
                } => match Self::check_reply(&reply, &record) {
                    Ok(narrative) => AgentState::Done(
                        Report::new(narrative, record.clone(), Utc::now(), language, attempt)
                            .with_statistics(reply.statistics),
                    ),
                    Err(e) => Self::after_failure(attempt, max_attempts, request, e),
                },

                AgentState::Retrying {
                    attempt,
                    request,
                    reason,
                } => {
                    let delay = self.config.retry.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        reason = reason.kind(),
                        error = %reason,
                        delay_ms = delay.as_millis() as u64,
                        "Report attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    AgentState::AwaitingModel {
                        attempt: attempt + 1,
                        request,
                    }
                }

                AgentState::Done(report) => {
                    tracing::info!(
                        home = %report.source_record().home_team(),
                        away = %report.source_record().away_team(),
                        attempts = report.attempts(),
                        language = %report.language(),
                        "Report generated"
                    );
                    return Ok(report);
                }

                AgentState::Failed(e) => {
                    tracing::error!(error = %e, kind = e.kind(), "Report generation failed");
                    return Err(e);
                }
            };
        }
    }

    fn build_request(&self, record: &MatchRecord, language: Language) -> ModelRequest {
        ModelRequest {
            system: REPORT_SYSTEM_PROMPT.to_string(),
            prompt: build_report_prompt(record, language, self.config.report_length_words),
            temperature: self.config.temperature,
        }
    }

    async fn call_model(&self, request: &ModelRequest) -> Result<GeneratedReport, AgentError> {
        let timeout = self.config.model_timeout();
        match tokio::time::timeout(timeout, self.model.generate(request)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(AgentError::from_model(e, timeout)),
            Err(_) => Err(AgentError::ModelTimeout(timeout)),
        }
    }

    fn after_failure(
        attempt: u32,
        max_attempts: u32,
        request: Arc<ModelRequest>,
        error: AgentError,
    ) -> AgentState {
        if !error.is_transient() {
            AgentState::Failed(error)
        } else if attempt >= max_attempts {
            AgentState::Failed(AgentError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(error),
            })
        } else {
            AgentState::Retrying {
                attempt,
                request,
                reason: error,
            }
        }
    }

    /// Validate and score-check one model reply
    fn check_reply(reply: &GeneratedReport, record: &MatchRecord) -> Result<String, AgentError> {
        let narrative = validate_generated(reply, record)
            .map_err(|e| AgentError::MalformedOutput(e.to_string()))?;

        let expected = record.final_score();
        check_score(&narrative, reply.final_score.as_deref(), expected)
            .map_err(|found| AgentError::ConsistencyMismatch { expected, found })?;

        Ok(narrative)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::model::GeneratedReport;
    use crate::service::llm::{ModelError, ModelRequest, ReportModel};

    /// Model replaying scripted replies and counting calls
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<GeneratedReport, ModelError>>>,
        fallback: Result<GeneratedReport, ModelError>,
        calls: AtomicU32,
        pub last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        /// Reply with `replies` in order, then with `fallback` forever
        pub fn new(
            replies: Vec<Result<GeneratedReport, ModelError>>,
            fallback: GeneratedReport,
        ) -> Self {
            Self::scripted(replies, Ok(fallback))
        }

        pub fn always(reply: GeneratedReport) -> Self {
            Self::new(Vec::new(), reply)
        }

        /// Fail every call with `error`
        pub fn failing(error: ModelError) -> Self {
            Self::scripted(Vec::new(), Err(error))
        }

        fn scripted(
            replies: Vec<Result<GeneratedReport, ModelError>>,
            fallback: Result<GeneratedReport, ModelError>,
        ) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                fallback,
                calls: AtomicU32::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportModel for ScriptedModel {
        async fn generate(&self, request: &ModelRequest) -> Result<GeneratedReport, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Structured reply for the Bohemians - Mladá Boleslav fixture
    pub fn reply(narrative: &str) -> GeneratedReport {
        GeneratedReport {
            is_valid: true,
            home_team: Some("Bohemians".to_string()),
            away_team: Some("Mladá Boleslav".to_string()),
            final_score: Some("2:1".to_string()),
            statistics: None,
            narrative: narrative.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::testing::{ScriptedModel, reply};
    use super::*;
    use crate::model::statistics::TeamCounts;
    use crate::model::{FieldValue, MatchStatistics, NormalizedFields, RetryPolicy, Score};
    use crate::service::llm::ModelError;
    use crate::service::validation::validate_match;

    const GOOD: &str = "Bohemians beat Mladá Boleslav 2:1 in Prague.";
    const WRONG: &str = "Mladá Boleslav won 1:2 in Prague.";
    const EXTRA_WRONG: &str = "Bohemians thrashed Mladá Boleslav 3:1 in Prague. It finished 2:1.";

    fn record() -> Arc<MatchRecord> {
        let fields = NormalizedFields {
            home_team: FieldValue::Present("Bohemians".to_string()),
            away_team: FieldValue::Present("Mladá Boleslav".to_string()),
            final_score: FieldValue::Present(Score::new(2, 1)),
            ..Default::default()
        };
        Arc::new(validate_match(&fields).unwrap())
    }

    fn agent(model: Arc<dyn ReportModel>, max_attempts: u32) -> ReportAgent {
        let config = AgentConfig {
            retry: RetryPolicy::immediate(max_attempts),
            ..Default::default()
        };
        ReportAgent::new(model, config)
    }

    #[tokio::test]
    async fn test_first_reply_accepted() {
        let model = Arc::new(ScriptedModel::always(reply(GOOD)));
        let report = agent(model.clone(), 3)
            .generate(record(), Language::English)
            .await
            .unwrap();

        assert_eq!(report.narrative_text(), GOOD);
        assert_eq!(report.attempts(), 1);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_then_success() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(reply(WRONG))], reply(GOOD)));
        let report = agent(model.clone(), 3)
            .generate(record(), Language::Czech)
            .await
            .unwrap();

        assert_eq!(report.attempts(), 2);
        assert_eq!(report.language(), Language::Czech);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_persistent_mismatch_exhausts_retries() {
        let model = Arc::new(ScriptedModel::always(reply(WRONG)));
        let err = agent(model.clone(), 3)
            .generate(record(), Language::English)
            .await
            .unwrap_err();

        match err {
            AgentError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, AgentError::ConsistencyMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_output_is_bounded() {
        let model = Arc::new(ScriptedModel::failing(ModelError::Malformed(
            "model submitted no report".to_string(),
        )));
        let err = agent(model.clone(), 2)
            .generate(record(), Language::English)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let model = Arc::new(ScriptedModel::new(
            vec![Err(ModelError::Rejected("invalid api key".to_string()))],
            reply(GOOD),
        ));
        let err = agent(model.clone(), 3)
            .generate(record(), Language::English)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Rejected(_)));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let model = Arc::new(ScriptedModel::new(
            vec![Err(ModelError::RateLimited)],
            reply(GOOD),
        ));
        let report = agent(model.clone(), 3)
            .generate(record(), Language::English)
            .await
            .unwrap();
        assert_eq!(report.attempts(), 2);
    }

    struct SlowModel;

    #[async_trait]
    impl ReportModel for SlowModel {
        async fn generate(&self, _request: &ModelRequest) -> Result<GeneratedReport, ModelError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(reply(GOOD))
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_model_timeout() {
        let config = AgentConfig {
            retry: RetryPolicy::immediate(2),
            model_timeout_ms: 20,
            ..Default::default()
        };
        let err = ReportAgent::new(Arc::new(SlowModel), config)
            .generate(record(), Language::English)
            .await
            .unwrap_err();

        match err {
            AgentError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, AgentError::ModelTimeout(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_record() {
        let model = Arc::new(ScriptedModel::always(reply(GOOD)));
        agent(model.clone(), 1)
            .generate(record(), Language::English)
            .await
            .unwrap();

        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Bohemians"));
        assert!(prompt.contains("2:1"));
    }

    #[tokio::test]
    async fn test_extra_wrong_score_is_retried() {
        let model = Arc::new(ScriptedModel::new(
            vec![Ok(reply(EXTRA_WRONG))],
            reply(GOOD),
        ));
        let report = agent(model.clone(), 3)
            .generate(record(), Language::English)
            .await
            .unwrap();

        assert_eq!(report.narrative_text(), GOOD);
        assert_eq!(report.attempts(), 2);
    }

    #[tokio::test]
    async fn test_statistics_attached_to_report() {
        let mut with_stats = reply(GOOD);
        with_stats.statistics = Some(MatchStatistics {
            shots: TeamCounts {
                home: Some(14),
                away: Some(9),
            },
            ..Default::default()
        });
        let model = Arc::new(ScriptedModel::always(with_stats));
        let report = agent(model, 1)
            .generate(record(), Language::English)
            .await
            .unwrap();
        assert_eq!(report.statistics().unwrap().shots.home, Some(14));

        let mut empty_stats = reply(GOOD);
        empty_stats.statistics = Some(MatchStatistics::default());
        let model = Arc::new(ScriptedModel::always(empty_stats));
        let report = agent(model, 1)
            .generate(record(), Language::English)
            .await
            .unwrap();
        assert!(report.statistics().is_none());
    }
}
