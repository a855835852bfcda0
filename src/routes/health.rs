use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
    pub sessions: usize,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub marketplace_api: String,
}

/// Health check endpoint - public
///
/// The gateway keeps serving cached session data while the marketplace API is
/// down, so an unreachable API only degrades the status.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (api_result, sessions) =
        tokio::join!(state.api_client.health_check(), state.sessions.len());

    if let Err(e) = &api_result {
        tracing::debug!(error = %e, "Marketplace API health check failed");
    }
    let (status, api_status) = if api_result.is_ok() {
        ("healthy", "ok")
    } else {
        ("degraded", "error")
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                marketplace_api: api_status.to_string(),
            },
            sessions,
        }),
    )
}
