//! ONNX-backed classifier.

use std::path::Path;
use std::sync::Mutex;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use super::{Classifier, ClassifierError, ModelInput};
use crate::types::ViewPrediction;

/// Classifier backed by a pretrained two-headed ONNX model.
///
/// Output head order follows the exported model: part identity first,
/// condition state second. The session is serialized behind a mutex; the
/// model itself is read-only.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    part_output: String,
    state_output: String,
}

impl OnnxClassifier {
    /// Load the model from an ONNX file.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(path)?;

        if session.inputs().is_empty() {
            return Err(ClassifierError::MissingInput);
        }
        if session.outputs().len() != 2 {
            return Err(ClassifierError::OutputArity {
                got: session.outputs().len(),
                expected: 2,
            });
        }

        let input_name = session.inputs()[0].name().to_string();
        let part_output = session.outputs()[0].name().to_string();
        let state_output = session.outputs()[1].name().to_string();
        tracing::info!(
            input = %input_name,
            part = %part_output,
            state = %state_output,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            part_output,
            state_output,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &ModelInput) -> Result<ViewPrediction, ClassifierError> {
        let shape = [1usize, input.edge, input.edge, 3];
        let value = Tensor::from_array((shape, input.pixels.clone()))?;

        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        let outputs = session.run(ort::inputs![self.input_name.as_str() => value])?;

        let (_, part) = outputs[self.part_output.as_str()].try_extract_tensor::<f32>()?;
        let (_, state) = outputs[self.state_output.as_str()].try_extract_tensor::<f32>()?;

        Ok(ViewPrediction {
            part_probabilities: part.to_vec(),
            state_probabilities: state.to_vec(),
        })
    }
}
