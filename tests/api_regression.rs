//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the diagnosis lifecycle using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port — runs in CI without `#[ignore]`.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use image::{Rgb, RgbImage};
use tower::ServiceExt;

use hydrodiag::classifier::{Classifier, ClassifierError, ModelInput};
use hydrodiag::{
    create_app, BlobStore, ReportStore, ServiceConfig, ServiceState, ViewPrediction,
};

// ============================================================================
// Test Fixtures
// ============================================================================

const PART_IMPULSOR: [f32; 4] = [0.7, 0.1, 0.1, 0.1];
const STATE_OPTIMO: [f32; 4] = [0.9, 0.05, 0.03, 0.02];
const STATE_RUPTURA: [f32; 4] = [0.02, 0.03, 0.05, 0.9];

/// Classifier that replays a fixed sequence of predictions, one per view.
struct ScriptedClassifier {
    predictions: Mutex<Vec<ViewPrediction>>,
}

impl ScriptedClassifier {
    fn new(mut predictions: Vec<ViewPrediction>) -> Self {
        predictions.reverse();
        Self {
            predictions: Mutex::new(predictions),
        }
    }

    /// Four optimal views and one ruptured view.
    fn four_clean_one_ruptured() -> Self {
        let mut predictions = vec![prediction(&PART_IMPULSOR, &STATE_OPTIMO); 4];
        predictions.push(prediction(&PART_IMPULSOR, &STATE_RUPTURA));
        Self::new(predictions)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, _input: &ModelInput) -> Result<ViewPrediction, ClassifierError> {
        let mut predictions = self.predictions.lock().unwrap();
        Ok(predictions.pop().expect("scripted classifier exhausted"))
    }
}

fn prediction(part: &[f32], state: &[f32]) -> ViewPrediction {
    ViewPrediction {
        part_probabilities: part.to_vec(),
        state_probabilities: state.to_vec(),
    }
}

struct TestHarness {
    state: ServiceState,
    reports: ReportStore,
    blobs: BlobStore,
    _temp_dir: tempfile::TempDir,
}

fn create_test_harness(classifier: Arc<dyn Classifier>) -> TestHarness {
    let temp_dir = tempfile::tempdir().unwrap();
    let reports = ReportStore::open(temp_dir.path().join("reports.db")).unwrap();
    let blobs = BlobStore::open(temp_dir.path().join("blobs"), "http://localhost:8080").unwrap();

    let state = ServiceState::new(
        &ServiceConfig::default(),
        classifier,
        Some(reports.clone()),
        Some(blobs.clone()),
    )
    .unwrap();

    TestHarness {
        state,
        reports,
        blobs,
        _temp_dir: temp_dir,
    }
}

fn png_bytes(shade: u8) -> Vec<u8> {
    let mut img = RgbImage::new(8, 8);
    for pixel in img.pixels_mut() {
        *pixel = Rgb([shade, shade, shade]);
    }
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

const BOUNDARY: &str = "hydrodiag-test-boundary";

/// Build a multipart/form-data body with one file part per image.
fn multipart_body(image_count: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for i in 0..image_count {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"view_{}.png\"\r\n",
                i + 1
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(&png_bytes(40 * (i as u8 + 1)));
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn diagnose_request(image_count: usize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/diagnose")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(image_count)))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_diagnose_rejects_wrong_image_count() {
    for count in [4, 6] {
        let harness =
            create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
        let app = create_app(harness.state.clone());

        let resp = app.oneshot(diagnose_request(count)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "count {count}");

        let json = json_body(resp).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");

        // Never a partial aggregation: nothing persisted, nothing stored.
        assert_eq!(harness.reports.count(), 0);
    }
}

#[tokio::test]
async fn test_diagnose_without_image_storage_is_503() {
    let state = ServiceState::new(
        &ServiceConfig::default(),
        Arc::new(ScriptedClassifier::four_clean_one_ruptured()),
        None,
        None,
    )
    .unwrap();
    let app = create_app(state);

    let resp = app.oneshot(diagnose_request(5)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "SERVICE_UNAVAILABLE");
}

// ============================================================================
// Diagnosis
// ============================================================================

#[tokio::test]
async fn test_diagnose_applies_severity_priority() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let app = create_app(harness.state.clone());

    let resp = app.oneshot(diagnose_request(5)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    // One ruptured view overrides four optimal views.
    assert_eq!(json["state"], "ruptura");
    assert_eq!(json["part"], "impulsor");
    assert_eq!(json["view_states"].as_array().unwrap().len(), 5);
    assert_eq!(json["view_states"][0], "optimo");
    assert_eq!(json["view_states"][4], "ruptura");
    assert_eq!(json["confidence_panel"].as_array().unwrap().len(), 4);
    assert!(json["suggestion"].as_str().unwrap().contains("ALERTA"));

    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 5);
    assert!(images[0]["url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:8080/api/v1/reports/"));

    // The report was persisted and all five images stored.
    assert_eq!(harness.reports.count(), 1);
    let report_id = json["report_id"].as_str().unwrap();
    for view in 1..=5 {
        assert!(harness.blobs.view_image(report_id, view).unwrap().is_some());
    }
}

#[tokio::test]
async fn test_diagnose_without_report_store_still_returns_report() {
    // Best-effort persistence: a dead report store must not fail the request.
    let temp_dir = tempfile::tempdir().unwrap();
    let blobs = BlobStore::open(temp_dir.path().join("blobs"), "http://localhost:8080").unwrap();
    let state = ServiceState::new(
        &ServiceConfig::default(),
        Arc::new(ScriptedClassifier::four_clean_one_ruptured()),
        None,
        Some(blobs),
    )
    .unwrap();
    let app = create_app(state);

    let resp = app.oneshot(diagnose_request(5)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["state"], "ruptura");
}

// ============================================================================
// Report Lifecycle
// ============================================================================

async fn diagnose_one(harness: &TestHarness) -> String {
    let app = create_app(harness.state.clone());
    let resp = app.oneshot(diagnose_request(5)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    json["report_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_report_listing_uses_iso8601_timestamps() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let report_id = diagnose_one(&harness).await;

    let app = create_app(harness.state.clone());
    let resp = app.oneshot(get_request("/api/v1/reports")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["report_id"], report_id.as_str());

    let created_at = listed[0]["created_at"].as_str().unwrap();
    assert!(
        created_at.parse::<chrono::DateTime<chrono::Utc>>().is_ok(),
        "not ISO-8601: {created_at}"
    );
}

#[tokio::test]
async fn test_get_report_by_id() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let report_id = diagnose_one(&harness).await;

    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(get_request(&format!("/api/v1/reports/{report_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["state"], "ruptura");

    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(get_request("/api/v1/reports/no-such-report"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_cascades_to_images() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let report_id = diagnose_one(&harness).await;
    assert!(harness.blobs.view_image(&report_id, 1).unwrap().is_some());

    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/reports/{report_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Gone from the listing and from the blob namespace.
    assert_eq!(harness.reports.count(), 0);
    for view in 1..=5 {
        assert!(harness.blobs.view_image(&report_id, view).unwrap().is_none());
    }

    // Deleting again is a 404.
    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/reports/{report_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Export & Image Serving
// ============================================================================

#[tokio::test]
async fn test_export_streams_spreadsheet() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let report_id = diagnose_one(&harness).await;

    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(get_request(&format!("/api/v1/reports/{report_id}/export")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .contains(report_id.as_str()));

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    // xlsx is a zip container.
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn test_export_unknown_report_is_404() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let app = create_app(harness.state.clone());

    let resp = app
        .oneshot(get_request("/api/v1/reports/no-such-report/export"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stored_images_are_served() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let report_id = diagnose_one(&harness).await;

    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(get_request(&format!("/api/v1/reports/{report_id}/images/1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    let app = create_app(harness.state.clone());
    let resp = app
        .oneshot(get_request(&format!("/api/v1/reports/{report_id}/images/9")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let harness = create_test_harness(Arc::new(ScriptedClassifier::four_clean_one_ruptured()));
    let app = create_app(harness.state.clone());

    let resp = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["report_store_available"], true);
    assert_eq!(json["image_storage_available"], true);
}
