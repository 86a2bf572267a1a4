use crate::core::state::AppState;
use crate::utils::time::current_timestamp;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether `index.html` is still present in the dist folder
    pub frontend: bool,
    pub timestamp: i64,
}

/// Readiness check for the portal server.
///
/// Answers 503 once the frontend build has gone missing, since every
/// page request would fail from then on.
///
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let frontend = tokio::fs::metadata(&state.index_html)
        .await
        .is_ok_and(|meta| meta.is_file());

    let (code, status) = if frontend {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            frontend,
            timestamp: current_timestamp(),
        }),
    )
}
