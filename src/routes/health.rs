//! Health check endpoint.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always "healthy" while the process is serving requests.
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// "live" when a directory client is configured, "mock" otherwise.
    pub mode: &'static str,
}

#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.gate.is_available() {
            "live"
        } else {
            "mock"
        },
    })
}
