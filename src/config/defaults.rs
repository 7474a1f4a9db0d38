//! System-wide default constants, grouped by subsystem.

// ============================================================================
// Diagnosis
// ============================================================================

/// Number of photograph views required per diagnosis request.
pub const VIEWS_PER_DIAGNOSIS: usize = 5;

/// Default state vocabulary, least to most severe. The order defines the
/// severity-priority aggregation policy.
pub const DEFAULT_STATE_LABELS: [&str; 4] = ["optimo", "desgaste", "corrosion", "ruptura"];

/// Default part vocabulary.
pub const DEFAULT_PART_LABELS: [&str; 4] = ["impulsor", "valvula", "engranaje", "sello"];

// ============================================================================
// Model
// ============================================================================

/// Edge length of the model's square RGB input (pixels).
pub const MODEL_INPUT_EDGE: u32 = 160;

/// Default path of the ONNX model artifact.
pub const DEFAULT_MODEL_PATH: &str = "./model/diagnosis.onnx";

// ============================================================================
// HTTP
// ============================================================================

/// Default bind address for the HTTP server.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Maximum accepted request body size for the diagnose endpoint (bytes).
///
/// Five photographs at a few MiB each fit comfortably.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

// ============================================================================
// Export
// ============================================================================

/// Display edge for images embedded in exported spreadsheets (pixels).
pub const EXPORT_IMAGE_EDGE_PX: u32 = 120;

/// HTTP timeout when fetching referenced images during export (seconds).
pub const EXPORT_FETCH_TIMEOUT_SECS: u64 = 10;
