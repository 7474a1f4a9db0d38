//! Image preprocessing for the classifier input.
//!
//! Decodes an uploaded photograph and normalizes it to the square RGB tensor
//! the model expects: NHWC layout, f32 pixels scaled to `[-1, 1]`
//! (the MobileNetV2 convention the model was trained with).

use image::imageops::FilterType;

use super::ClassifierError;

/// One decoded view, normalized to the model's input format.
#[derive(Debug, Clone)]
pub struct ModelInput {
    /// NHWC pixel data, `edge * edge * 3` values in `[-1, 1]`.
    pub pixels: Vec<f32>,
    /// Edge length of the square input in pixels.
    pub edge: usize,
}

/// Decode raw upload bytes and normalize to the model input format.
pub fn prepare(bytes: &[u8], edge: u32) -> Result<ModelInput, ClassifierError> {
    let decoded = image::load_from_memory(bytes)?.to_rgb8();
    let resized = image::imageops::resize(&decoded, edge, edge, FilterType::Triangle);

    let pixels = resized
        .as_raw()
        .iter()
        .map(|&p| p as f32 / 127.5 - 1.0)
        .collect();

    Ok(ModelInput {
        pixels,
        edge: edge as usize,
    })
}
