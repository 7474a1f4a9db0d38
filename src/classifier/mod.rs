//! Classifier boundary.
//!
//! The model is an externally trained black box: given one preprocessed view
//! it returns two probability distributions, one over part identities and one
//! over condition states. It is injected behind the [`Classifier`] trait so
//! the ONNX runtime can be swapped for a stub in tests and development.

mod onnx;
pub mod preprocess;

pub use onnx::OnnxClassifier;
pub use preprocess::ModelInput;

use thiserror::Error;

use crate::types::ViewPrediction;

/// Errors from preprocessing or model inference for a single view.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("onnx runtime: {0}")]
    Runtime(#[from] ort::Error),
    #[error("model exposes {got} outputs, expected {expected} (part, state)")]
    OutputArity { got: usize, expected: usize },
    #[error("model exposes no inputs")]
    MissingInput,
}

/// A pretrained two-headed part/state classifier.
///
/// Implementations must be pure with respect to the input: the same
/// preprocessed view always yields the same prediction. Safe for unlimited
/// concurrent read-only use.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &ModelInput) -> Result<ViewPrediction, ClassifierError>;
}

/// Deterministic classifier for tests and `--stub-classifier` mode.
///
/// Returns the same prediction for every view, so the service can run
/// end-to-end without model artifacts on disk.
pub struct StubClassifier {
    part_probabilities: Vec<f32>,
    state_probabilities: Vec<f32>,
}

impl StubClassifier {
    pub fn new(part_probabilities: Vec<f32>, state_probabilities: Vec<f32>) -> Self {
        Self {
            part_probabilities,
            state_probabilities,
        }
    }

    /// Uniform distributions over both vocabularies.
    pub fn uniform(part_count: usize, state_count: usize) -> Self {
        Self::new(
            vec![1.0 / part_count.max(1) as f32; part_count],
            vec![1.0 / state_count.max(1) as f32; state_count],
        )
    }
}

impl Classifier for StubClassifier {
    fn classify(&self, _input: &ModelInput) -> Result<ViewPrediction, ClassifierError> {
        Ok(ViewPrediction {
            part_probabilities: self.part_probabilities.clone(),
            state_probabilities: self.state_probabilities.clone(),
        })
    }
}
