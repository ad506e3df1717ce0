use gridspot::{Detection, LabelTable, ObjectDetector};
use image::{DynamicImage, ImageBuffer, Rgb};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

/// COCO index of "fire hydrant"
pub const HYDRANT_CLASS: usize = 10;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Solid blue image with the listed grid cells painted red
pub fn make_grid_image(width: u32, height: u32, grid_size: u32, red_cells: &[(u32, u32)]) -> DynamicImage {
    let cell_w = width / grid_size;
    let cell_h = height / grid_size;
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let (row, col) = (y / cell_h, x / cell_w);
        if red_cells.contains(&(row, col)) { RED } else { BLUE }
    });
    DynamicImage::ImageRgb8(img)
}

/// Image whose pixel at (x, y) encodes its own coordinates
pub fn make_coordinate_image(width: u32, height: u32) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0u8]));
    DynamicImage::ImageRgb8(img)
}

/// Saves an image as PNG in a temp file; the file is removed on drop
pub fn save_temp_image(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Paths `dir/image_1.png ..= dir/image_<count>.png`
pub fn expected_tile_paths(dir: &Path, count: u32) -> Vec<PathBuf> {
    (1..=count).map(|id| gridspot::tiling::tile_path(dir, id)).collect()
}

/// Deterministic detector: reports a hydrant when the center pixel is red,
/// and always reports one unrelated "person" detection
pub struct FakeDetector {
    labels: LabelTable,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self::with_labels(LabelTable::coco())
    }

    pub fn with_labels(labels: LabelTable) -> Self {
        Self {
            labels,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectDetector for FakeDetector {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        let mut detections = vec![Detection {
            class_index: 0,
            confidence: 0.5,
            x1: 0.0,
            y1: 0.0,
            x2: w as f32,
            y2: h as f32,
        }];

        if *rgb.get_pixel(w / 2, h / 2) == RED {
            detections.push(Detection {
                class_index: HYDRANT_CLASS,
                confidence: 0.9,
                x1: 0.0,
                y1: 0.0,
                x2: w as f32,
                y2: h as f32,
            });
        }

        Ok(detections)
    }
}

/// Detector whose backend is down: every `detect` call fails
pub struct FailingDetector {
    labels: LabelTable,
    calls: AtomicUsize,
}

impl FailingDetector {
    pub fn new() -> Self {
        Self {
            labels: LabelTable::coco(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectDetector for FailingDetector {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn detect(&self, _img: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("inference backend unavailable")
    }
}
