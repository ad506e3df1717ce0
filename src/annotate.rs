use anyhow::Context;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{GridGeometry, TileId};
use crate::pipeline::BoundingBox;

/// How positive tiles are marked on the output image
#[derive(Debug, Clone, Copy)]
pub struct MarkerStyle {
    pub outline_color: Rgba<u8>,
    /// Outline thickness, drawn inward from the tile edge
    pub outline_width: u32,
    pub check_color: Rgba<u8>,
    pub check_width: u32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            outline_color: Rgba([255, 0, 0, 255]),
            outline_width: 5,
            check_color: Rgba([0, 255, 0, 255]),
            check_width: 50,
        }
    }
}

/// Draw the markers for every positive tile onto a copy of the original
pub fn annotate(
    original: &DynamicImage,
    geometry: &GridGeometry,
    positives: &[TileId],
    style: &MarkerStyle,
) -> anyhow::Result<RgbaImage> {
    let mut canvas = original.to_rgba8();

    for &id in positives {
        let rect = geometry.tile_rect(id)?;
        debug!("Marking tile {} at ({}, {}) {}x{}", id, rect.x, rect.y, rect.width, rect.height);
        draw_outline(&mut canvas, &rect, style);
        draw_checkmark(&mut canvas, &rect, style);
    }

    Ok(canvas)
}

fn draw_outline(canvas: &mut RgbaImage, rect: &BoundingBox, style: &MarkerStyle) {
    for inset in 0..style.outline_width {
        let (Some(width), Some(height)) = (
            rect.width.checked_sub(2 * inset).filter(|w| *w > 0),
            rect.height.checked_sub(2 * inset).filter(|h| *h > 0),
        ) else {
            break;
        };

        let outline = Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, outline, style.outline_color);
    }
}

/// Endpoints of the two checkmark strokes, or None if the tile is too small
pub fn checkmark_segments(rect: &BoundingBox) -> Option<[((f32, f32), (f32, f32)); 2]> {
    let v = (rect.width.min(rect.height) / 4) as f32;
    if v == 0.0 {
        return None;
    }

    let (cx, cy) = rect.center();
    let (cx, cy) = (cx as f32, cy as f32);
    Some([
        ((cx - v, cy), (cx, cy + v)),
        ((cx, cy + v), (cx + v, cy - v)),
    ])
}

fn draw_checkmark(canvas: &mut RgbaImage, rect: &BoundingBox, style: &MarkerStyle) {
    if let Some(segments) = checkmark_segments(rect) {
        for (start, end) in segments {
            draw_thick_line(canvas, start, end, style.check_width, style.check_color);
        }
    }
}

/// Line segment with a stroke width, drawn as a filled quad
fn draw_thick_line(canvas: &mut RgbaImage, start: (f32, f32), end: (f32, f32), width: u32, color: Rgba<u8>) {
    if width <= 1 {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return;
    }

    let half = width as f32 / 2.0;
    let (nx, ny) = (-dy / length * half, dx / length * half);
    let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
    let quad = [
        corner(start.0 + nx, start.1 + ny),
        corner(end.0 + nx, end.1 + ny),
        corner(end.0 - nx, end.1 - ny),
        corner(start.0 - nx, start.1 - ny),
    ];

    draw_polygon_mut(canvas, &quad, color);
}

/// `<output_dir>/checked_<source file name>.jpg`
pub fn output_path(output_dir: &Path, source: &Path) -> anyhow::Result<PathBuf> {
    let name = source.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Source path has no file name: {}", source.display()))?;
    Ok(output_dir.join(format!("checked_{}.jpg", name)))
}

/// Save the annotated image, creating the parent directory if needed
pub fn save_annotated(image: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    // JPEG has no alpha channel
    DynamicImage::ImageRgba8(image.clone())
        .to_rgb8()
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save annotated image {}: {}", path.display(), e))?;

    Ok(())
}
