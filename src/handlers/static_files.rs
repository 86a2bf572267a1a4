use crate::core::state::AppState;
use crate::handlers::fallback::spa_fallback;
use axum::{
    extract::{Request, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA},
        HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
    routing::{get, MethodRouter},
};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' https://challenges.cloudflare.com; \
    frame-src https://challenges.cloudflare.com; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
    font-src 'self' https://fonts.gstatic.com; \
    img-src 'self' data: blob: https:; \
    connect-src 'self' https://api.booleanclient.online https://*.booleanclient.online;";

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Headers set on every response
pub fn security_headers() -> [(HeaderName, HeaderValue); 6] {
    use axum::http::header::{
        CONTENT_SECURITY_POLICY as CSP, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        X_XSS_PROTECTION,
    };

    [
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        // The legacy XSS auditor is disabled on purpose
        (X_XSS_PROTECTION, HeaderValue::from_static("0")),
        (REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin")),
        (PERMISSIONS_POLICY, HeaderValue::from_static("geolocation=(), microphone=(), camera=()")),
        (CSP, HeaderValue::from_static(CONTENT_SECURITY_POLICY)),
    ]
}

/// Files from `dist`, with unknown paths answered by the SPA entry point
pub fn serve_dist(state: Arc<AppState>) -> ServeDir<MethodRouter> {
    let fallback: MethodRouter = get(spa_fallback).with_state(Arc::clone(&state));
    ServeDir::new(&state.dist_dir).fallback(fallback)
}

/// HTML must always be revalidated so new builds show up immediately;
/// everything else may be cached for `static_max_age`
pub async fn cache_headers(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    let success = response.status().is_success();

    let headers = response.headers_mut();
    if is_html {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
    } else if success {
        let max_age = format!("public, max-age={}", state.config.server.static_max_age);
        if let Ok(value) = HeaderValue::from_str(&max_age) {
            headers.insert(CACHE_CONTROL, value);
        }
    }

    response
}
