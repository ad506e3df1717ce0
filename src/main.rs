use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gridspot::config::{self, RunConfig};
use gridspot::{LabelTable, YoloDetector, YoloParams};

#[derive(Parser)]
#[command(name = "gridspot")]
#[command(about = "Split an image into a grid and mark the tiles that contain a target object")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Number of rows and columns to split the image into
    #[arg(short, long, value_name = "N")]
    grid_size: u32,

    /// Detection model (.rten)
    #[arg(long, value_name = "PATH", default_value = config::DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Label file with one class name per line (defaults to COCO)
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Class name to look for
    #[arg(long, value_name = "LABEL", default_value = config::DEFAULT_TARGET_LABEL)]
    target: String,

    /// Minimum detection confidence
    #[arg(long, value_name = "FLOAT", default_value_t = 0.25)]
    confidence: f32,

    /// Directory for temporary tiles
    #[arg(long, value_name = "DIR", default_value = config::DEFAULT_TILE_DIR)]
    tile_dir: PathBuf,

    /// Directory for the annotated image
    #[arg(long, value_name = "DIR", default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Keep tiles on disk after the run
    #[arg(long)]
    keep_tiles: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gridspot={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if !(0.0..=1.0).contains(&args.confidence) {
        anyhow::bail!("Confidence must be between 0 and 1, got {}", args.confidence);
    }

    let labels = match &args.labels {
        Some(path) => LabelTable::from_file(path)?,
        None => LabelTable::coco(),
    };
    // Reject an unknown target before paying for the model load
    gridspot::detection::resolve_target_class(&labels, &args.target)?;

    let params = YoloParams {
        conf_threshold: args.confidence,
        ..YoloParams::default()
    };
    let detector = YoloDetector::load(&args.model, labels, params)?;

    let config = RunConfig::new(args.image_path, args.grid_size)
        .with_target_label(args.target)
        .with_tile_dir(args.tile_dir)
        .with_output_dir(args.output_dir)
        .with_keep_tiles(args.keep_tiles)
        .with_debug_dir(args.debug_out);

    let report = gridspot::run(&config, Arc::new(detector))?;

    println!("\n=== Grid Detection Results ===");
    println!("Tiles checked: {}", report.tile_count());
    if report.positive_tiles.is_empty() {
        println!("No tiles contain '{}'.", config.target_label);
    } else {
        let ids: Vec<String> = report.positive_tiles.iter().map(|id| id.to_string()).collect();
        println!("Tiles containing '{}': {}", config.target_label, ids.join(", "));
    }
    println!("Saved checked image: {}", report.output_path.display());

    Ok(())
}
