pub mod annotate;
pub mod config;
pub mod detection;
pub mod models;
pub mod pipeline;
pub mod run;
pub mod tiling;

pub use models::{Detection, GridGeometry, Tile, TileId};
pub use config::RunConfig;
pub use detection::{LabelTable, ObjectDetector, YoloDetector, YoloParams};
pub use pipeline::{
    Pipeline, PipelineData, PipelineStep, PipelineContext,
    BoundingBox, MetadataValue, DebugConfig
};
pub use run::{run, RunReport};
