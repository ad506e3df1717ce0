use image::DynamicImage;
use crate::pipeline::BoundingBox;

/// 1-based tile identifier, assigned in row-major order over the grid
pub type TileId = u32;

/// Grid layout of an image split into `grid_size × grid_size` cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub image_width: u32,
    pub image_height: u32,
    pub grid_size: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridGeometry {
    pub fn new(image_width: u32, image_height: u32, grid_size: u32) -> anyhow::Result<Self> {
        if grid_size == 0 {
            anyhow::bail!("Grid size must be at least 1");
        }
        if grid_size.checked_mul(grid_size).is_none() {
            anyhow::bail!("Grid size {} yields more tiles than can be numbered", grid_size);
        }

        // Remainder pixels on the right/bottom are not part of any tile
        let cell_width = image_width / grid_size;
        let cell_height = image_height / grid_size;

        if cell_width == 0 || cell_height == 0 {
            anyhow::bail!(
                "Grid size {} is too large for a {}x{} image",
                grid_size, image_width, image_height
            );
        }

        Ok(Self {
            image_width,
            image_height,
            grid_size,
            cell_width,
            cell_height,
        })
    }

    pub fn for_image(img: &DynamicImage, grid_size: u32) -> anyhow::Result<Self> {
        Self::new(img.width(), img.height(), grid_size)
    }

    pub fn tile_count(&self) -> u32 {
        self.grid_size * self.grid_size
    }

    pub fn id_of(&self, row: u32, col: u32) -> TileId {
        row * self.grid_size + col + 1
    }

    /// Inverse of `id_of`: `(row, col)` for a tile id
    pub fn cell_of(&self, id: TileId) -> anyhow::Result<(u32, u32)> {
        if id == 0 || id > self.tile_count() {
            anyhow::bail!(
                "Tile id {} is outside 1..={} for a {}x{} grid",
                id, self.tile_count(), self.grid_size, self.grid_size
            );
        }
        let index = id - 1;
        Ok((index / self.grid_size, index % self.grid_size))
    }

    /// Rectangle of a tile in the original image's coordinates
    pub fn tile_rect(&self, id: TileId) -> anyhow::Result<BoundingBox> {
        let (row, col) = self.cell_of(id)?;
        Ok(BoundingBox {
            x: col * self.cell_width,
            y: row * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
        })
    }

    /// All tile ids in row-major order
    pub fn tile_ids(&self) -> std::ops::RangeInclusive<TileId> {
        1..=self.tile_count()
    }

    /// Width of the strip on the right that no tile covers
    pub fn dropped_columns(&self) -> u32 {
        self.image_width - self.cell_width * self.grid_size
    }

    /// Height of the strip at the bottom that no tile covers
    pub fn dropped_rows(&self) -> u32 {
        self.image_height - self.cell_height * self.grid_size
    }
}

/// One cropped cell of the grid
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    pub row: u32,
    pub col: u32,
    pub bbox: BoundingBox,
    pub image: DynamicImage,
}

/// Single object reported by a detector, in the pixel space of the image it ran on
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_index: usize,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}
