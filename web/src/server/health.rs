//! Liveness and readiness probes.

use axum::Json;
use serde::Serialize;

/// Liveness body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process answers
    pub status: &'static str,
    /// Crate version, for deploy verification
    pub version: &'static str,
}

/// Liveness probe: the process is up and serving.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness body
#[derive(Serialize)]
pub struct ReadinessResponse {
    /// Whether the engine can take traffic
    pub ready: bool,
}

/// Readiness probe.
///
/// The engine's stores are in-process, so there is no external
/// dependency to verify; the endpoint exists for orchestration probes.
pub async fn readiness_check() -> Json<ReadinessResponse> {
    Json(ReadinessResponse { ready: true })
}
