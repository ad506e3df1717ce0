use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::detection::{has_target, ObjectDetector};
use crate::models::{GridGeometry, TileId};
use crate::tiling;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Read the location written by `SaveTilesStep`
pub fn tile_path(item: &PipelineData) -> Result<PathBuf> {
    item.get_string("tile_path")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("Missing tile_path"))
}

/// Read the tile id stamped by `TilingStep`
pub fn tile_id(item: &PipelineData) -> Result<TileId> {
    item.get_int("tile_id")
        .and_then(|id| TileId::try_from(id).ok())
        .ok_or_else(|| anyhow::anyhow!("Missing tile_id"))
}

/// Split each image into a grid of tiles - one image becomes grid_size² regions
pub struct TilingStep {
    pub grid_size: u32,
}

impl PipelineStep for TilingStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let geometry = GridGeometry::for_image(&item.image, self.grid_size)?;
            debug!(
                "Splitting {}x{} image into {}x{} grid of {}x{} cells",
                geometry.image_width, geometry.image_height,
                geometry.grid_size, geometry.grid_size,
                geometry.cell_width, geometry.cell_height
            );

            for tile in tiling::split_with_geometry(&item.image, &geometry)? {
                let tile_data = PipelineData::from_region(tile.image, item.original.clone(), tile.bbox)
                    .with_metadata("tile_id", MetadataValue::Int(tile.id as i64))
                    .with_metadata("row", MetadataValue::Int(tile.row as i64))
                    .with_metadata("col", MetadataValue::Int(tile.col as i64));
                result.push(tile_data);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Grid Tiling"
    }
}

/// Persist every tile as `image_<id>.png` in a directory
pub struct SaveTilesStep {
    pub tile_dir: PathBuf,
}

impl PipelineStep for SaveTilesStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        tiling::create_tile_dir(&self.tile_dir)?;

        let mut result = Vec::new();
        for item in data {
            let path = tiling::save_tile(&item.image, &self.tile_dir, tile_id(&item)?)?;
            let path = path.to_string_lossy().into_owned();
            result.push(item.with_metadata("tile_path", MetadataValue::String(path)));
        }

        debug!("Saved {} tiles to {}", result.len(), self.tile_dir.display());
        Ok(result)
    }

    fn name(&self) -> &str {
        "Save Tiles"
    }
}

/// Keep only tiles where the detector reports the target class
pub struct TargetFilterStep {
    detector: Arc<dyn ObjectDetector>,
    class_index: usize,
}

impl TargetFilterStep {
    pub fn new(detector: Arc<dyn ObjectDetector>, class_index: usize) -> Self {
        Self { detector, class_index }
    }
}

impl PipelineStep for TargetFilterStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        let total = data.len();

        for (i, item) in data.into_iter().enumerate() {
            let id = tile_id(&item)?;
            let detections = self.detector.detect(&item.image)?;
            debug!("  Tile {} ({} of {}): {} detections", id, i + 1, total, detections.len());

            if !has_target(&detections, self.class_index) {
                continue;
            }

            let best = detections.iter()
                .filter(|d| d.class_index == self.class_index)
                .map(|d| d.confidence)
                .fold(0.0f32, f32::max);
            info!("Tile {} contains the target (confidence {:.2})", id, best);

            result.push(
                item.with_metadata("positive", MetadataValue::Bool(true))
                    .with_metadata("confidence", MetadataValue::Float(best)),
            );
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Target Detection"
    }
}
