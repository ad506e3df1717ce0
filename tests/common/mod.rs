#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from gridspot for tests
pub use gridspot::{BoundingBox, GridGeometry, LabelTable, RunConfig, TileId};
