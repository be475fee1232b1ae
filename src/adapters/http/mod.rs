//! HTTP adapters - REST API implementations.
//!
//! Each feature has its own HTTP adapter; [`build_router`] mounts them all
//! behind the shared tracing, CORS and timeout layers.

pub mod error;
pub mod refinement;
pub mod settings;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::RefinementOrchestrator;
use crate::config::ServerConfig;
use crate::ports::SettingsRepository;

pub use error::ErrorResponse;
pub use refinement::{refinement_routes, RefinementHandlers};
pub use settings::{settings_routes, SettingsHandlers};

/// Builds the full application router.
pub fn build_router(
    orchestrator: Arc<RefinementOrchestrator>,
    settings: Arc<dyn SettingsRepository>,
    server: &ServerConfig,
) -> Router {
    Router::new()
        .route("/ping", get(refinement::ping))
        .nest(
            "/api/refine",
            refinement_routes(RefinementHandlers::new(orchestrator)),
        )
        .nest("/api/config", settings_routes(SettingsHandlers::new(settings)))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

/// Configured origins when given; otherwise permissive outside production.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return if server.is_production() {
            CorsLayer::new()
        } else {
            CorsLayer::permissive()
        };
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
