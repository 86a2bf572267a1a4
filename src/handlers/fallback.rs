use crate::core::error::ServerError;
use crate::core::state::AppState;
use axum::{extract::State, response::Html};
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::error;

/// Serve the SPA entry point for any path that is not a file in `dist`,
/// leaving routing to the frontend
pub async fn spa_fallback(State(state): State<Arc<AppState>>) -> Result<Html<String>, ServerError> {
    match tokio::fs::read_to_string(&state.index_html).await {
        Ok(html) => Ok(Html(html)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!(path = %state.index_html.display(), "Entry point disappeared from dist folder");
            Err(ServerError::EntryPointMissing)
        }
        Err(e) => {
            error!(path = %state.index_html.display(), error = %e, "Failed to read entry point");
            Err(ServerError::InternalError(e.to_string()))
        }
    }
}
