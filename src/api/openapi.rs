//! OpenAPI specification endpoints

use actix_web::{HttpResponse, Responder, get};
use utoipa::OpenApi;

use crate::api::error::ErrorResponse;
use crate::api::health::{DependencyHealth, HealthStatus, ReadinessStatus};
use crate::api::report::{CreateReportRequest, ReportResponse};
use crate::model::Language;
use crate::model::statistics::{
    CardEvent, CardKind, GoalEvent, GoalKind, KickOutcome, MatchStatistics, Possession,
    ShootoutKick, Side, TeamCounts,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "scoreflash",
        description = "Generates narrative reports for finished football matches"
    ),
    paths(
        crate::api::report::create_report,
        crate::api::health::liveness,
        crate::api::health::readiness
    ),
    components(schemas(
        CreateReportRequest,
        ReportResponse,
        Language,
        MatchStatistics,
        Possession,
        TeamCounts,
        GoalEvent,
        GoalKind,
        CardEvent,
        CardKind,
        ShootoutKick,
        KickOutcome,
        Side,
        ErrorResponse,
        HealthStatus,
        ReadinessStatus,
        DependencyHealth
    )),
    tags(
        (name = "reports", description = "Match report generation"),
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_report_endpoint() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["paths"]["/v1/reports"]["post"].is_object());
        assert!(doc["paths"]["/health/live"]["get"].is_object());
        assert!(doc["components"]["schemas"]["ReportResponse"].is_object());
        assert!(doc["components"]["schemas"]["MatchStatistics"].is_object());
        assert!(
            doc["components"]["schemas"]["ReportResponse"]["properties"]["statistics"].is_object()
        );
    }
}
