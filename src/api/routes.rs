//! API route definitions.
//!
//! Diagnosis lifecycle endpoints:
//! - POST /api/v1/diagnose - five-view diagnosis
//! - GET /api/v1/reports - list persisted reports
//! - GET /api/v1/reports/:id - single report
//! - DELETE /api/v1/reports/:id - delete report + images
//! - GET /api/v1/reports/:id/export - xlsx download
//! - GET /api/v1/reports/:id/images/:view - stored view image

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers::{self, ServiceState};

/// Create all API routes.
pub fn api_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/diagnose", post(handlers::diagnose))
        .route("/reports", get(handlers::list_reports))
        .route("/reports/:id", get(handlers::get_report))
        .route("/reports/:id", delete(handlers::delete_report))
        .route("/reports/:id/export", get(handlers::export_report))
        .route("/reports/:id/images/:view", get(handlers::get_report_image))
        .with_state(state)
}

/// Legacy health endpoint at root level.
pub fn legacy_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
