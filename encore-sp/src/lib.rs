//! encore-sp library - search proxy
//!
//! Normalizes free-text and link queries into one result list drawn from the
//! music catalog or the social-audio provider.

use axum::Router;
use encore_common::health::health_routes;
use std::sync::Arc;

pub mod api;
pub mod normalizer;

use normalizer::SearchNormalizer;

/// Module name reported by `/health`
pub const MODULE_NAME: &str = "encore-sp";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub normalizer: Arc<SearchNormalizer>,
}

impl AppState {
    pub fn new(normalizer: SearchNormalizer) -> Self {
        Self {
            normalizer: Arc::new(normalizer),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::get;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route(
            "/api/search",
            get(api::search).options(api::search_preflight),
        )
        .merge(health_routes(MODULE_NAME, env!("CARGO_PKG_VERSION")))
        .layer(middleware::from_fn(api::cors_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
