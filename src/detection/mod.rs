pub mod labels;
pub mod steps;
pub mod yolo;

use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use crate::models::Detection;

pub use labels::{LabelTable, COCO_LABELS};
pub use yolo::{YoloDetector, YoloParams};

/// Minimal capability of an object-detection model
pub trait ObjectDetector: Send + Sync {
    /// Index → name table for the class indices this detector reports
    fn labels(&self) -> &LabelTable;

    /// Run the model on one image
    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<Detection>>;
}

/// Look up the class index of `target` in the detector's vocabulary
pub fn resolve_target_class(labels: &LabelTable, target: &str) -> anyhow::Result<usize> {
    labels.index_of(target).ok_or_else(|| {
        anyhow::anyhow!(
            "Label '{}' is not in the model vocabulary ({} labels)",
            target,
            labels.len()
        )
    })
}

/// True if any detection carries the target class
pub fn has_target(detections: &[Detection], class_index: usize) -> bool {
    detections.iter().any(|d| d.class_index == class_index)
}

/// Build the standard tile → persist → detect pipeline
///
/// Resolves the target class up front, so a label missing from the
/// vocabulary fails here, before any inference.
pub fn build_standard_pipeline(
    detector: Arc<dyn ObjectDetector>,
    target_label: &str,
    grid_size: u32,
    tile_dir: &Path,
) -> anyhow::Result<crate::pipeline::Pipeline> {
    use crate::pipeline::Pipeline;
    use crate::detection::steps::*;

    let class_index = resolve_target_class(detector.labels(), target_label)?;

    Ok(Pipeline::new()
        .add_step(Arc::new(TilingStep { grid_size }))
        .add_step(Arc::new(SaveTilesStep { tile_dir: tile_dir.to_path_buf() }))
        .add_step(Arc::new(TargetFilterStep::new(detector, class_index))))
}
