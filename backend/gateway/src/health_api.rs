//! Gateway Health API

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler for `GET /api/health`
pub async fn get_health() -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        service: "docgate",
        version: env!("CARGO_PKG_VERSION"),
    })
}
