//! REST API endpoint for match reports

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};
use crate::model::{ArchivedReport, Language, MatchStatistics};
use crate::service::ReportPipeline;

/// Request body for report generation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    /// Match page URL (livesport.cz or flashscore)
    pub url: String,
    /// Narrative language, defaults to the configured language
    pub language: Option<Language>,
}

/// A generated and archived match report
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub home_team: String,
    pub away_team: String,
    /// Final score, home goals first, e.g. "2:1"
    pub final_score: String,
    pub narrative_text: String,
    /// RFC 3339 generation timestamp
    pub generated_at: String,
    pub language: Language,
    /// Model calls needed to produce a consistent report
    pub attempts: u32,
    /// Statistics the model read from the match and statistics pages
    pub statistics: Option<MatchStatistics>,
    /// File name of the archived JSON report
    pub archive_file: String,
}

impl From<&ArchivedReport> for ReportResponse {
    fn from(archived: &ArchivedReport) -> Self {
        let record = archived.report.source_record();
        Self {
            home_team: record.home_team().to_string(),
            away_team: record.away_team().to_string(),
            final_score: record.final_score().to_string(),
            narrative_text: archived.report.narrative_text().to_string(),
            generated_at: archived.report.generated_at().to_rfc3339(),
            language: archived.report.language(),
            attempts: archived.report.attempts(),
            statistics: archived.report.statistics().cloned(),
            archive_file: archived.archive.filename.clone(),
        }
    }
}

/// Generate a report for a finished match
///
/// Fetches the match page, validates the extracted facts, asks the model
/// for a narrative that agrees with the final score and archives it.
#[utoipa::path(
    post,
    path = "/v1/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report generated and archived", body = ReportResponse),
        (status = 400, description = "Invalid or unsupported URL", body = ErrorResponse),
        (status = 409, description = "Report with the same archive name exists", body = ErrorResponse),
        (status = 422, description = "Match page lacks required data", body = ErrorResponse),
        (status = 502, description = "Page rendering or model provider failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "reports"
)]
#[post("/v1/reports")]
pub async fn create_report(
    pipeline: web::Data<ReportPipeline>,
    body: web::Json<CreateReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    if request.url.trim().is_empty() {
        return Err(ApiError::BadRequest("url must not be empty".to_string()));
    }

    let language = request
        .language
        .unwrap_or_else(|| pipeline.default_language());
    let archived = pipeline.generate_report(&request.url, language).await?;

    Ok(HttpResponse::Created().json(ReportResponse::from(&archived)))
}

/// Configure report routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_report);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::fetcher::MatchPageFetcher;
    use crate::fetcher::extract::MATCH_PAGE;
    use crate::fetcher::testing::ScriptedRenderer;
    use crate::model::{AgentConfig, FetcherConfig, RetryPolicy};
    use crate::service::agent::testing::{ScriptedModel, reply};
    use crate::service::{ArchiveWriter, ReportAgent};

    const MATCH_URL: &str = "https://www.livesport.cz/zapas/fotbal/bohemians/mlada-boleslav/?mid=abc";

    fn pipeline(dir: &std::path::Path) -> web::Data<ReportPipeline> {
        let fetcher = MatchPageFetcher::new(
            FetcherConfig {
                fetch_stats_page: false,
                ..Default::default()
            },
            Arc::new(ScriptedRenderer::always(MATCH_PAGE)),
        )
        .unwrap();
        let agent = ReportAgent::new(
            Arc::new(ScriptedModel::always(reply(
                "Bohemians edged Mladá Boleslav 2:1.",
            ))),
            AgentConfig {
                retry: RetryPolicy::immediate(2),
                ..Default::default()
            },
        );
        web::Data::new(ReportPipeline::new(
            fetcher,
            agent,
            ArchiveWriter::new(dir),
            RetryPolicy::immediate(1),
            1_000,
        ))
    }

    #[actix_web::test]
    async fn test_create_report() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(pipeline(dir.path()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/reports")
            .set_json(serde_json::json!({ "url": MATCH_URL, "language": "cs" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["home_team"], "Bohemians");
        assert_eq!(body["final_score"], "2:1");
        assert_eq!(body["language"], "cs");
        assert_eq!(body["attempts"], 1);
        assert!(body["statistics"].is_null());
        assert!(body["archive_file"].as_str().unwrap().ends_with(".json"));
    }

    #[actix_web::test]
    async fn test_unsupported_url_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(pipeline(dir.path()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/reports")
            .set_json(serde_json::json!({ "url": "https://example.com/match/1/" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "unsupported_url");
    }

    #[actix_web::test]
    async fn test_report_file_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(pipeline(dir.path()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/reports")
            .set_json(serde_json::json!({ "url": MATCH_URL }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let archived = dir.path().join(body["archive_file"].as_str().unwrap());
        let payload: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(archived).unwrap()).unwrap();
        assert_eq!(payload["narrative_text"], "Bohemians edged Mladá Boleslav 2:1.");
        assert_eq!(payload["language"], "en");
    }
}
