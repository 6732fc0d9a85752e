//! Health check endpoints for Kubernetes liveness and readiness checks

use std::path::Path;

use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::ReportPipeline;

#[derive(Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessStatus {
    pub status: String,
    pub version: String,
    pub dependencies: DependencyHealth,
}

#[derive(Serialize, ToSchema)]
pub struct DependencyHealth {
    pub archive: String,
    pub renderer: String,
    pub model: String,
}

/// Liveness endpoint
///
/// Always returns 200 OK if the service is running.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Service is alive", body = HealthStatus)
    ),
    tag = "health"
)]
#[get("/health/live")]
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok().json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness endpoint
///
/// Returns 200 OK when the archive directory is usable. The check only
/// inspects the filesystem and never creates the directory.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessStatus),
        (status = 503, description = "Service is not ready", body = ReadinessStatus)
    ),
    tag = "health"
)]
#[get("/health/ready")]
pub async fn readiness(pipeline: web::Data<ReportPipeline>) -> impl Responder {
    let archive_status = archive_status(pipeline.archive_dir()).await;

    let ready = archive_status == "healthy";
    let status = ReadinessStatus {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dependencies: DependencyHealth {
            archive: archive_status.to_string(),
            renderer: pipeline.renderer_name().to_string(),
            model: pipeline.model_name().to_string(),
        },
    };

    if ready {
        HttpResponse::Ok().json(status)
    } else {
        HttpResponse::ServiceUnavailable().json(status)
    }
}

/// Whether the archive directory exists and is writable, or can be created
///
/// A missing directory is fine as long as its parent is a writable
/// directory, since the archive writer creates it on first use.
async fn archive_status(dir: &Path) -> &'static str {
    let target = match tokio::fs::metadata(dir).await {
        Ok(meta) => Some((dir, meta)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let parent = match dir.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            tokio::fs::metadata(parent)
                .await
                .ok()
                .map(|meta| (parent, meta))
        }
        Err(e) => {
            tracing::error!(path = %dir.display(), error = %e, "Archive directory unavailable");
            return "unhealthy";
        }
    };

    match target {
        Some((_, meta)) if meta.is_dir() && !meta.permissions().readonly() => "healthy",
        Some((path, _)) => {
            tracing::error!(path = %path.display(), "Archive location is not a writable directory");
            "unhealthy"
        }
        None => {
            tracing::error!(path = %dir.display(), "Archive directory and its parent are missing");
            "unhealthy"
        }
    }
}

/// Configure health check routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(liveness).service(readiness);
}
