//! hydrodiag: Multi-View Hydraulic Part Diagnosis
//!
//! Diagnostic intelligence service for hydraulic parts photographed from
//! five views.
//!
//! ## Architecture
//!
//! - **Classifier**: pretrained two-headed model behind an injected trait
//! - **Diagnosis**: severity-priority aggregation of the per-view predictions
//! - **Storage**: sled report store + per-report image blob namespace
//! - **Export**: spreadsheet rendering of stored reports
//! - **API**: axum HTTP surface with a uniform error envelope

pub mod api;
pub mod classifier;
pub mod config;
pub mod diagnosis;
pub mod export;
pub mod storage;
pub mod types;

// Re-export the HTTP surface
pub use api::{create_app, ApiError, ServiceState};

// Re-export the service configuration
pub use config::ServiceConfig;

// Re-export the classifier boundary
pub use classifier::{Classifier, ClassifierError, OnnxClassifier, StubClassifier};

// Re-export the aggregation core
pub use diagnosis::{aggregate, Diagnosis, InvalidInput};

// Re-export storage
pub use storage::{BlobStore, ReportStore, StorageError};

// Re-export commonly used types
pub use types::{
    ConfidenceEntry, DiagnosticReport, ImageRef, PartVocabulary, StateVocabulary, ViewPrediction,
};
