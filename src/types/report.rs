//! Prediction and report records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-view classifier output: two probability distributions over the fixed
/// part and state vocabularies.
///
/// Produced by the classifier for one photograph, consumed only by the
/// aggregator. Vectors are indexed by vocabulary position and each sums to
/// approximately 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPrediction {
    pub part_probabilities: Vec<f32>,
    pub state_probabilities: Vec<f32>,
}

/// Reference to one stored view image.
///
/// The URL is publicly fetchable through the HTTP surface; the blob key is
/// the opaque handle inside the report's blob namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub blob_key: String,
}

/// One row of the confidence panel: averaged model confidence for a state,
/// formatted as a percentage string (e.g. `"73.42%"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEntry {
    pub state: String,
    pub confidence: String,
}

/// The aggregate diagnostic verdict for one five-view request.
///
/// Created once at request time and immutable after persistence; deletion is
/// explicit and cascade-deletes the images stored under the report's
/// identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Unique report identifier (UUID v4).
    pub report_id: String,
    /// Creation instant, UTC. Serialized as ISO-8601.
    pub created_at: DateTime<Utc>,
    /// Identified part label (mode across the five per-view winners).
    pub part: String,
    /// Final aggregated state label (most severe per-view winner).
    pub state: String,
    /// Averaged per-state confidence across the five views.
    pub confidence_panel: Vec<ConfidenceEntry>,
    /// Advisory text derived from the final state label.
    pub suggestion: String,
    /// The five per-view state labels, kept verbatim for audit.
    pub view_states: Vec<String>,
    /// The five stored view images, in submission order.
    pub images: Vec<ImageRef>,
}
