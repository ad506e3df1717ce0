use anyhow::Context;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::models::{Tile, TileId};

const TILE_PREFIX: &str = "image_";
const TILE_EXTENSION: &str = "png";

/// Location of a persisted tile: `<dir>/image_<id>.png`
pub fn tile_path(dir: &Path, id: TileId) -> PathBuf {
    dir.join(format!("{}{}.{}", TILE_PREFIX, id, TILE_EXTENSION))
}

/// Recover the tile id from a path produced by `tile_path`
pub fn parse_tile_id(path: &Path) -> anyhow::Result<TileId> {
    let stem = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Not a tile file: {}", path.display()))?;

    let number = stem.strip_prefix(TILE_PREFIX)
        .ok_or_else(|| anyhow::anyhow!("Tile file name must start with '{}': {}", TILE_PREFIX, path.display()))?;

    let id: TileId = number.parse()
        .with_context(|| format!("Invalid tile number in {}", path.display()))?;
    if id == 0 {
        anyhow::bail!("Tile numbers start at 1: {}", path.display());
    }
    Ok(id)
}

/// Tile ids of persisted tiles, ascending
pub fn parse_tile_ids(paths: &[PathBuf]) -> anyhow::Result<Vec<TileId>> {
    let mut ids = paths.iter()
        .map(|path| parse_tile_id(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    ids.sort_unstable();
    Ok(ids)
}

/// Create the tile directory if it does not exist yet
pub fn create_tile_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create tile directory {}", dir.display()))
}

/// Write every tile to `dir` (created if missing), returning paths in tile order
pub fn save_tiles(tiles: &[Tile], dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    create_tile_dir(dir)?;

    tiles.iter()
        .map(|tile| save_tile(&tile.image, dir, tile.id))
        .collect()
}

/// Write one tile image to its derived location inside `dir`
pub fn save_tile(image: &DynamicImage, dir: &Path, id: TileId) -> anyhow::Result<PathBuf> {
    let path = tile_path(dir, id);
    image.save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to save tile {}: {}", path.display(), e))?;
    debug!("Saved tile {} ({}x{})", path.display(), image.width(), image.height());
    Ok(path)
}

/// Delete persisted tiles. A missing file is an error.
pub fn remove_tiles(paths: &[PathBuf]) -> anyhow::Result<()> {
    for path in paths {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove tile {}", path.display()))?;
    }
    Ok(())
}
