//! Integration tests for the detection filter.
//!
//! Tests cover:
//! - Label tables and target class lookup
//! - Matching detections against the target class
//! - The tile → save → detect pipeline with a fake detector

mod common;

use gridspot::detection::steps::{tile_id, TargetFilterStep, TilingStep};
use gridspot::detection::{build_standard_pipeline, has_target, resolve_target_class};
use gridspot::{Detection, Pipeline};
use std::sync::Arc;

use common::*;

fn detection(class_index: usize) -> Detection {
    Detection { class_index, confidence: 0.8, x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0 }
}

#[test]
fn test_coco_table_resolves_fire_hydrant() -> anyhow::Result<()> {
    let labels = LabelTable::coco();
    assert_eq!(labels.len(), 80);
    assert_eq!(resolve_target_class(&labels, "fire hydrant")?, HYDRANT_CLASS);
    assert_eq!(labels.name(HYDRANT_CLASS), Some("fire hydrant"));
    Ok(())
}

#[test]
fn test_missing_label_is_an_error() {
    let labels = LabelTable::new(["person", "car"]);
    let err = resolve_target_class(&labels, "fire hydrant").unwrap_err();
    assert!(err.to_string().contains("fire hydrant"));
}

#[test]
fn test_label_file_parsing() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("labels.txt");
    std::fs::write(&path, "hydrant\n\n  fire hydrant  \nbench\n")?;

    let labels = LabelTable::from_file(&path)?;
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.index_of("fire hydrant"), Some(1));

    std::fs::write(&path, "\n \n")?;
    assert!(LabelTable::from_file(&path).is_err());
    assert!(LabelTable::from_file(&dir.path().join("missing.txt")).is_err());
    Ok(())
}

#[test]
fn test_has_target() {
    assert!(!has_target(&[], HYDRANT_CLASS));
    assert!(!has_target(&[detection(0), detection(2)], HYDRANT_CLASS));
    assert!(has_target(&[detection(0), detection(HYDRANT_CLASS)], HYDRANT_CLASS));
}

#[test]
fn test_filter_keeps_only_positive_tiles() -> anyhow::Result<()> {
    let img = make_grid_image(120, 120, 3, &[(0, 2), (2, 0)]);
    let detector = Arc::new(FakeDetector::new());

    let pipeline = Pipeline::new()
        .add_step(Arc::new(TilingStep { grid_size: 3 }))
        .add_step(Arc::new(TargetFilterStep::new(detector.clone(), HYDRANT_CLASS)));
    let positives = pipeline.run(img)?;

    let ids = positives.iter().map(tile_id).collect::<anyhow::Result<Vec<_>>>()?;
    assert_eq!(ids, vec![3, 7]);
    assert_eq!(detector.calls(), 9);

    for item in &positives {
        assert_eq!(item.get_bool("positive"), Some(true));
        assert_eq!(item.get_float("confidence"), Some(0.9));
    }
    Ok(())
}

#[test]
fn test_standard_pipeline_saves_tiles() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let img = make_grid_image(80, 80, 2, &[(1, 1)]);
    let detector = Arc::new(FakeDetector::new());

    let pipeline = build_standard_pipeline(detector, "fire hydrant", 2, dir.path())?;
    assert_eq!(pipeline.step_names(), vec!["Grid Tiling", "Save Tiles", "Target Detection"]);

    let positives = pipeline.run(img)?;
    assert_eq!(positives.len(), 1);
    assert_eq!(tile_id(&positives[0])?, 4);

    let saved = positives[0].get_string("tile_path").map(std::path::PathBuf::from);
    assert_eq!(saved, Some(gridspot::tiling::tile_path(dir.path(), 4)));
    for path in expected_tile_paths(dir.path(), 4) {
        assert!(path.exists(), "{} was not written", path.display());
    }
    Ok(())
}

#[test]
fn test_standard_pipeline_rejects_unknown_label() {
    let dir = tempfile::TempDir::new().unwrap();
    let detector = Arc::new(FakeDetector::with_labels(LabelTable::new(["person"])));

    let result = build_standard_pipeline(detector.clone(), "fire hydrant", 2, dir.path());
    assert!(result.is_err());
    assert_eq!(detector.calls(), 0);
}

#[test]
fn test_unwritable_tile_dir_reports_path() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"file, not a directory")?;

    let pipeline = build_standard_pipeline(Arc::new(FakeDetector::new()), "fire hydrant", 2, &blocker)?;
    let err = pipeline.run(make_grid_image(20, 20, 2, &[])).unwrap_err();

    let chain = format!("{err:#}");
    assert!(chain.contains("Failed to create tile directory"), "unexpected error: {chain}");
    assert!(chain.contains("occupied"), "unexpected error: {chain}");
    Ok(())
}
