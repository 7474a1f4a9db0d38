//! API route handlers.
//!
//! Request handling for the diagnosis lifecycle: multi-view diagnose,
//! report listing and lookup, cascade delete, spreadsheet export, and
//! stored image serving.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::error::ApiError;
use crate::classifier::{preprocess, Classifier};
use crate::config::{defaults, ConfigError, ServiceConfig};
use crate::diagnosis::aggregate;
use crate::export;
use crate::storage::{BlobStore, ReportStore, StorageError};
use crate::types::{DiagnosticReport, PartVocabulary, StateVocabulary};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers.
///
/// Everything here is read-only per request: the classifier and
/// vocabularies are fixed at startup, the stores provide their own interior
/// synchronization. Stores are optional so the service degrades to 503s
/// when a backing store failed to open (rather than refusing to start).
#[derive(Clone)]
pub struct ServiceState {
    pub classifier: Arc<dyn Classifier>,
    pub parts: Arc<PartVocabulary>,
    pub states: Arc<StateVocabulary>,
    pub reports: Option<ReportStore>,
    pub blobs: Option<BlobStore>,
    pub model_input_edge: u32,
    pub export_image_edge_px: u32,
}

impl ServiceState {
    /// Build the state from a validated config and constructed collaborators.
    pub fn new(
        config: &ServiceConfig,
        classifier: Arc<dyn Classifier>,
        reports: Option<ReportStore>,
        blobs: Option<BlobStore>,
    ) -> Result<Self, ConfigError> {
        let (parts, states) = config.vocabularies()?;
        Ok(Self {
            classifier,
            parts: Arc::new(parts),
            states: Arc::new(states),
            reports,
            blobs,
            model_input_edge: config.model.input_edge,
            export_image_edge_px: config.export.image_edge_px,
        })
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<export::ExportError> for ApiError {
    fn from(err: export::ExportError) -> Self {
        ApiError::Internal(err.into())
    }
}

// ============================================================================
// Diagnose
// ============================================================================

/// POST /api/v1/diagnose — diagnose a part from exactly five view images.
///
/// Each image is stored under the new report's blob namespace and then
/// classified; a failure on any single view aborts the whole request naming
/// that view. Persisting the finished report is best-effort: a failed write
/// is logged and the computed report is still returned to the caller.
pub async fn diagnose(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<Json<DiagnosticReport>, ApiError> {
    let blobs = state
        .blobs
        .as_ref()
        .ok_or(ApiError::Unavailable("image storage"))?;

    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let bytes = field.bytes().await?;
        uploads.push((file_name, bytes.to_vec()));
    }

    if uploads.len() != defaults::VIEWS_PER_DIAGNOSIS {
        return Err(ApiError::Validation(format!(
            "exactly {} images are required, got {}",
            defaults::VIEWS_PER_DIAGNOSIS,
            uploads.len()
        )));
    }

    let report_id = Uuid::new_v4().to_string();
    let mut predictions = Vec::with_capacity(uploads.len());
    let mut images = Vec::with_capacity(uploads.len());

    for (i, (file_name, bytes)) in uploads.iter().enumerate() {
        let view = i + 1;

        let extension = FsPath::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let image_ref = blobs
            .put_view(&report_id, view, extension, bytes)
            .map_err(|source| ApiError::ViewUpload { view, source })?;
        tracing::debug!(report_id = %report_id, view, "View image stored");
        images.push(image_ref);

        let input = preprocess::prepare(bytes, state.model_input_edge)
            .map_err(|source| ApiError::Classification { view, source })?;
        let prediction = state
            .classifier
            .classify(&input)
            .map_err(|source| ApiError::Classification { view, source })?;
        predictions.push(prediction);
    }

    let diagnosis = aggregate(&predictions, &state.parts, &state.states)?;
    let report = DiagnosticReport {
        report_id,
        created_at: Utc::now(),
        part: diagnosis.part,
        state: diagnosis.state,
        confidence_panel: diagnosis.confidence_panel,
        suggestion: diagnosis.suggestion,
        view_states: diagnosis.view_states,
        images,
    };

    match &state.reports {
        Some(store) => {
            if let Err(e) = store.insert(&report) {
                tracing::warn!(
                    report_id = %report.report_id,
                    "Failed to persist report, returning it anyway: {}",
                    e
                );
            } else {
                tracing::info!(
                    report_id = %report.report_id,
                    part = %report.part,
                    verdict = %report.state,
                    "Report persisted"
                );
            }
        }
        None => {
            tracing::warn!(
                report_id = %report.report_id,
                "Report store unavailable; report not persisted"
            );
        }
    }

    Ok(Json(report))
}

// ============================================================================
// Report Lifecycle
// ============================================================================

/// GET /api/v1/reports — all persisted reports, newest first.
pub async fn list_reports(
    State(state): State<ServiceState>,
) -> Result<Json<Vec<DiagnosticReport>>, ApiError> {
    let store = state
        .reports
        .as_ref()
        .ok_or(ApiError::Unavailable("report store"))?;
    Ok(Json(store.list()?))
}

/// GET /api/v1/reports/:id — a single report.
pub async fn get_report(
    State(state): State<ServiceState>,
    Path(report_id): Path<String>,
) -> Result<Json<DiagnosticReport>, ApiError> {
    let store = state
        .reports
        .as_ref()
        .ok_or(ApiError::Unavailable("report store"))?;

    store
        .get(&report_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("report {report_id} not found")))
}

/// DELETE /api/v1/reports/:id — delete a report and cascade-delete its
/// images.
pub async fn delete_report(
    State(state): State<ServiceState>,
    Path(report_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state
        .reports
        .as_ref()
        .ok_or(ApiError::Unavailable("report store"))?;

    if store.get(&report_id)?.is_none() {
        return Err(ApiError::NotFound(format!("report {report_id} not found")));
    }

    if let Some(blobs) = &state.blobs {
        let removed = blobs.delete_report(&report_id)?;
        tracing::info!(report_id = %report_id, removed, "Deleted report images");
    }
    store.delete(&report_id)?;

    Ok(Json(serde_json::json!({
        "report_id": report_id,
        "deleted": true,
    })))
}

/// GET /api/v1/reports/:id/export — the report as an xlsx download.
pub async fn export_report(
    State(state): State<ServiceState>,
    Path(report_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .reports
        .as_ref()
        .ok_or(ApiError::Unavailable("report store"))?;
    let report = store
        .get(&report_id)?
        .ok_or_else(|| ApiError::NotFound(format!("report {report_id} not found")))?;

    let bytes =
        export::render_report(&report, state.blobs.as_ref(), state.export_image_edge_px).await?;

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"reporte_{report_id}.xlsx\""),
        ),
    ];
    Ok((headers, bytes))
}

/// GET /api/v1/reports/:id/images/:view — a stored view image.
pub async fn get_report_image(
    State(state): State<ServiceState>,
    Path((report_id, view)): Path<(String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let blobs = state
        .blobs
        .as_ref()
        .ok_or(ApiError::Unavailable("image storage"))?;

    match blobs.view_image(&report_id, view)? {
        Some((bytes, name)) => {
            let mime = mime_guess::from_path(&name).first_or_octet_stream();
            Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes))
        }
        None => Err(ApiError::NotFound(format!(
            "image {view} of report {report_id} not found"
        ))),
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health response for the legacy `/health` endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub reports_stored: usize,
    pub report_store_available: bool,
    pub image_storage_available: bool,
}

/// GET /health — liveness and backing-store availability.
pub async fn health_check(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        reports_stored: state.reports.as_ref().map(|s| s.count()).unwrap_or(0),
        report_store_available: state.reports.is_some(),
        image_storage_available: state.blobs.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::StubClassifier;

    fn create_test_state() -> ServiceState {
        let config = ServiceConfig::default();
        ServiceState::new(
            &config,
            Arc::new(StubClassifier::uniform(4, 4)),
            None,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_check_reports_missing_stores() {
        let state = create_test_state();
        let response = health_check(State(state)).await;
        assert_eq!(response.status, "healthy");
        assert!(!response.report_store_available);
        assert!(!response.image_storage_available);
        assert_eq!(response.reports_stored, 0);
    }

    #[tokio::test]
    async fn test_list_without_store_is_unavailable() {
        let state = create_test_state();
        let err = list_reports(State(state)).await.unwrap_err();
        assert!(matches!(err, ApiError::Unavailable("report store")));
    }
}
