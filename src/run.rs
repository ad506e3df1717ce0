use anyhow::Context;
use image::ImageReader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::annotate::{self, MarkerStyle};
use crate::config::RunConfig;
use crate::detection::{build_standard_pipeline, steps, ObjectDetector};
use crate::models::{GridGeometry, TileId};
use crate::tiling;

/// Outcome of one tile-detect-annotate run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub geometry: GridGeometry,
    /// Ids of tiles containing the target, ascending
    pub positive_tiles: Vec<TileId>,
    /// Persisted tiles flagged positive, in detection order
    pub positive_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    /// Tiles deleted during cleanup (empty with `keep_tiles`)
    pub removed_tiles: Vec<PathBuf>,
}

impl RunReport {
    pub fn tile_count(&self) -> u32 {
        self.geometry.tile_count()
    }
}

/// Tile the image, detect the target per tile, mark positives and clean up
pub fn run(config: &RunConfig, detector: Arc<dyn ObjectDetector>) -> anyhow::Result<RunReport> {
    run_with_style(config, detector, &MarkerStyle::default())
}

pub fn run_with_style(
    config: &RunConfig,
    detector: Arc<dyn ObjectDetector>,
    style: &MarkerStyle,
) -> anyhow::Result<RunReport> {
    config.validate()?;

    // Fails on an unknown target label before any tile is inferred
    let mut pipeline = build_standard_pipeline(
        detector,
        &config.target_label,
        config.grid_size,
        &config.tile_dir,
    )?;
    if let Some(debug_dir) = &config.debug_dir {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let img = Arc::new(
        ImageReader::open(&config.image_path)
            .with_context(|| format!("Failed to open image {}", config.image_path.display()))?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?,
    );
    info!("Image loaded: {}x{}", img.width(), img.height());

    let geometry = GridGeometry::for_image(&img, config.grid_size)?;
    info!(
        "Checking {} tiles of {}x{} for '{}'",
        geometry.tile_count(), geometry.cell_width, geometry.cell_height, config.target_label
    );

    let positives = pipeline.run_shared(Arc::clone(&img))?;

    // Reassembly works from the persisted tile names
    let positive_paths = positives.iter()
        .map(steps::tile_path)
        .collect::<anyhow::Result<Vec<_>>>()?;
    drop(positives);
    let positive_tiles = tiling::parse_tile_ids(&positive_paths)?;

    let annotated = annotate::annotate(&img, &geometry, &positive_tiles, style)?;
    let output_path = annotate::output_path(&config.output_dir, &config.image_path)?;
    annotate::save_annotated(&annotated, &output_path)?;
    info!("Saved annotated image: {}", output_path.display());

    let removed_tiles = if config.keep_tiles {
        Vec::new()
    } else {
        let paths: Vec<PathBuf> = geometry.tile_ids()
            .map(|id| tiling::tile_path(&config.tile_dir, id))
            .collect();
        tiling::remove_tiles(&paths)?;
        paths
    };

    Ok(RunReport {
        geometry,
        positive_tiles,
        positive_paths,
        output_path,
        removed_tiles,
    })
}
