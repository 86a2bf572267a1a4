// HTTP routes configuration

use crate::core::state::AppState;
use crate::handlers::health::health_handler;
use crate::handlers::static_files::{cache_headers, security_headers, serve_dist};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Everything that is not an API route is the frontend
    let frontend = Router::new()
        .fallback_service(serve_dist(Arc::clone(&state)))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), cache_headers));

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(frontend);

    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    router
}
