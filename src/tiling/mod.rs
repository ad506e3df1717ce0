pub mod storage;

use image::DynamicImage;
use crate::models::{GridGeometry, Tile};

pub use storage::{
    create_tile_dir, parse_tile_id, parse_tile_ids, remove_tiles, save_tile, save_tiles, tile_path,
};

/// Split an image into `grid_size × grid_size` tiles in row-major order.
///
/// Cells are `floor(width / grid_size) × floor(height / grid_size)`, so the
/// right and bottom remainder strips end up in no tile.
pub fn split_into_grid(img: &DynamicImage, grid_size: u32) -> anyhow::Result<Vec<Tile>> {
    let geometry = GridGeometry::for_image(img, grid_size)?;
    split_with_geometry(img, &geometry)
}

/// Split using a precomputed geometry (must match the image dimensions)
pub fn split_with_geometry(img: &DynamicImage, geometry: &GridGeometry) -> anyhow::Result<Vec<Tile>> {
    if (img.width(), img.height()) != (geometry.image_width, geometry.image_height) {
        anyhow::bail!(
            "Grid was computed for {}x{} but image is {}x{}",
            geometry.image_width, geometry.image_height, img.width(), img.height()
        );
    }

    let mut tiles = Vec::with_capacity(geometry.tile_count() as usize);
    for id in geometry.tile_ids() {
        let (row, col) = geometry.cell_of(id)?;
        let bbox = geometry.tile_rect(id)?;
        tiles.push(Tile {
            id,
            row,
            col,
            bbox,
            image: img.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height),
        });
    }

    Ok(tiles)
}
