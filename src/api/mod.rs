//! REST API module using Axum.
//!
//! HTTP surface for the diagnosis service: the five-view diagnose endpoint,
//! report lifecycle (list, read, delete, export) and stored image serving,
//! with a uniform JSON error envelope.

pub mod error;
pub mod handlers;
mod routes;

pub use error::ApiError;
pub use handlers::ServiceState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults::MAX_UPLOAD_BYTES;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `HYDRODIAG_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for development.
fn build_cors_layer() -> CorsLayer {
    match std::env::var("HYDRODIAG_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE])
        }
        Err(_) => CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    }
}

/// Create the complete application router.
pub fn create_app(state: ServiceState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::legacy_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
