use std::path::PathBuf;

pub const DEFAULT_TARGET_LABEL: &str = "fire hydrant";
pub const DEFAULT_MODEL_PATH: &str = "../model/best_custom.rten";
pub const DEFAULT_TILE_DIR: &str = "../test_images/testing";
pub const DEFAULT_OUTPUT_DIR: &str = "../result";

/// Everything one run needs; replaces interactive prompts and fixed paths
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub image_path: PathBuf,
    pub grid_size: u32,
    pub target_label: String,
    /// Directory receiving the temporary `image_<id>.png` tiles
    pub tile_dir: PathBuf,
    /// Directory receiving `checked_<name>.jpg`
    pub output_dir: PathBuf,
    /// Leave tiles on disk after the run
    pub keep_tiles: bool,
    /// Save per-step debug images here (must be empty)
    pub debug_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(image_path: impl Into<PathBuf>, grid_size: u32) -> Self {
        Self {
            image_path: image_path.into(),
            grid_size,
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            tile_dir: PathBuf::from(DEFAULT_TILE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            keep_tiles: false,
            debug_dir: None,
        }
    }

    pub fn with_target_label(mut self, label: impl Into<String>) -> Self {
        self.target_label = label.into();
        self
    }

    pub fn with_tile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tile_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_keep_tiles(mut self, keep: bool) -> Self {
        self.keep_tiles = keep;
        self
    }

    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.grid_size == 0 {
            anyhow::bail!("Grid size must be at least 1");
        }
        if self.target_label.trim().is_empty() {
            anyhow::bail!("Target label must not be empty");
        }
        Ok(())
    }
}
