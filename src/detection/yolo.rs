use anyhow::Context;
use image::DynamicImage;
use image::imageops::FilterType;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;
use std::path::Path;
use tracing::debug;

use crate::detection::{LabelTable, ObjectDetector};
use crate::models::Detection;

/// Tunables for YOLO-style detectors
#[derive(Debug, Clone, Copy)]
pub struct YoloParams {
    /// Side of the square network input
    pub input_size: u32,
    /// Minimum class score for a detection to be reported
    pub conf_threshold: f32,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
        }
    }
}

/// YOLOv8-style detector running on rten.
///
/// Expects a single `[1, 3, S, S]` input and a single `[1, 4 + classes, anchors]`
/// output where the first four rows hold `cx, cy, w, h` in input pixels.
pub struct YoloDetector {
    model: Model,
    labels: LabelTable,
    params: YoloParams,
}

impl YoloDetector {
    /// Load a `.rten` model from disk
    pub fn load(model_path: &Path, labels: LabelTable, params: YoloParams) -> anyhow::Result<Self> {
        if !model_path.exists() {
            anyhow::bail!(
                "Detection model not found: {}\n\
                 Convert an ONNX export with: rten-convert model.onnx model.rten",
                model_path.display()
            );
        }

        let model = Model::load_file(model_path)
            .with_context(|| format!("Failed to load detection model {}", model_path.display()))?;

        debug!("Loaded detection model {} ({} labels)", model_path.display(), labels.len());

        Ok(Self { model, labels, params })
    }
}

/// Resize to a square network input and convert to NCHW floats in [0, 1]
pub fn to_input_tensor(img: &DynamicImage, size: u32) -> NdTensor<f32, 4> {
    let resized = img.resize_exact(size, size, FilterType::Triangle).to_rgb8();

    let plane = (size * size) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = pixel[channel] as f32 / 255.0;
        }
    }

    NdTensor::from_data([1, 3, size as usize, size as usize], data)
}

/// Decode a `[1, 4 + classes, anchors]` output: best class per anchor,
/// boxes scaled back to a `width × height` image
pub fn decode_predictions(
    output: &NdTensor<f32, 3>,
    params: &YoloParams,
    width: u32,
    height: u32,
) -> Vec<Detection> {
    let rows = output.size(1);
    let anchors = output.size(2);
    if rows <= 4 {
        return Vec::new();
    }

    let scale_x = width as f32 / params.input_size as f32;
    let scale_y = height as f32 / params.input_size as f32;

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for row in 4..rows {
            let score = output[[0, row, anchor]];
            if score > best_score {
                best_score = score;
                best_class = row - 4;
            }
        }

        if best_score < params.conf_threshold {
            continue;
        }

        let cx = output[[0, 0, anchor]];
        let cy = output[[0, 1, anchor]];
        let w = output[[0, 2, anchor]];
        let h = output[[0, 3, anchor]];

        detections.push(Detection {
            class_index: best_class,
            confidence: best_score,
            x1: ((cx - w / 2.0) * scale_x).max(0.0),
            y1: ((cy - h / 2.0) * scale_y).max(0.0),
            x2: ((cx + w / 2.0) * scale_x).min(width as f32),
            y2: ((cy + h / 2.0) * scale_y).min(height as f32),
        });
    }

    detections
}

impl ObjectDetector for YoloDetector {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        let input = to_input_tensor(img, self.params.input_size);

        let output = self.model.run_one(input.view().into(), None)
            .map_err(|e| anyhow::anyhow!("Model inference failed: {}", e))?;
        let output: NdTensor<f32, 3> = output.try_into()
            .map_err(|e| anyhow::anyhow!("Unexpected model output: {:?}", e))?;

        let detections = decode_predictions(&output, &self.params, img.width(), img.height());
        debug!("{} detections above {:.2}", detections.len(), self.params.conf_threshold);
        Ok(detections)
    }
}
