//! Folder Evaluation Driver
//!
//! Classifies every image in a folder with an ONNX binary classifier and
//! writes the annotated grid, the probability histogram, a predictions
//! manifest and per-class folders.
//!
//! Usage:
//! ```
//! evaluate-folder --dir <image_dir> --model <model.onnx> [--out <output_dir>]
//! ```
//!
//! A JSON configuration can be given with `--config`; command line flags
//! override the values it contains.

use clap::Parser;
use glomeruli_eval::core::config::{EvalConfig, LoaderConfig, SelectionMode};
use glomeruli_eval::core::{OnnxClassifier, init_tracing};
use glomeruli_eval::pipeline::FolderEvaluator;
use glomeruli_eval::processors::GlyphAnnotator;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for the folder evaluation driver
#[derive(Parser)]
#[command(name = "evaluate-folder")]
#[command(about = "Evaluates a binary glomeruli classifier on a folder of images")]
struct Args {
    /// Folder of images to classify
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Path to the ONNX model file
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Output directory for reports
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid side length; defaults to the smallest square holding every image
    #[arg(long)]
    grid_size: Option<usize>,

    /// Margin between grid tiles in pixels
    #[arg(long)]
    margin: Option<usize>,

    /// Pick grid tiles at random when the folder overflows the grid
    #[arg(long)]
    random: bool,

    /// Seed for random tile selection
    #[arg(long)]
    seed: Option<u64>,

    /// TrueType font for grid labels
    #[arg(long)]
    font: Option<PathBuf>,

    /// Classification threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Images per inference call
    #[arg(long)]
    batch_size: Option<usize>,
}

/// Merges the configuration file with command line overrides.
fn build_config(args: &Args) -> Result<EvalConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EvalConfig::from_json_file(path)?
        }
        None => EvalConfig::default(),
    };

    if let Some(dir) = &args.dir {
        config.input_dir = Some(dir.clone());
    }
    if let Some(model) = &args.model {
        config.inference.model_path = Some(model.clone());
        // Without a configuration file the input geometry follows the model name.
        if args.config.is_none() {
            config.loader = LoaderConfig::for_model_path(model);
        }
    }
    if let Some(out) = &args.out {
        config.report.output_dir = out.clone();
    }
    if let Some(grid_size) = args.grid_size {
        config.grid.grid_size = Some(grid_size);
    }
    if let Some(margin) = args.margin {
        config.grid.margin = margin;
    }
    if args.random {
        config.grid.selection = SelectionMode::Random;
    }
    if let Some(seed) = args.seed {
        config.grid.seed = Some(seed);
    }
    if let Some(font) = &args.font {
        config.font_path = Some(font.clone());
    }
    if let Some(threshold) = args.threshold {
        config.report.threshold = threshold;
    }
    if let Some(batch_size) = args.batch_size {
        config.inference.batch_size = batch_size;
    }

    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    init_tracing();

    let args = Args::parse();
    let config = build_config(&args)?;

    let Some(input_dir) = config.input_dir.clone() else {
        error!("No input folder given; use --dir or set input_dir in the configuration");
        return Err("No input folder given".into());
    };
    if !input_dir.is_dir() {
        error!("Input folder not found: {}", input_dir.display());
        return Err("Input folder not found".into());
    }

    let classifier = OnnxClassifier::from_config(&config.inference)?;
    info!(
        "Loaded model {} ({}x{}x{} input)",
        classifier.model_name(),
        config.loader.width,
        config.loader.height,
        config.loader.depth
    );

    let annotator = GlyphAnnotator::from_optional_path(config.font_path.as_deref());
    if !annotator.is_available() {
        error!("No usable font found; pass one with --font");
        return Err("No usable font found".into());
    }

    let evaluator = FolderEvaluator::new(&config, classifier, annotator)?;
    let summary = evaluator.evaluate(&input_dir)?;

    info!("Evaluation Results:");
    info!("  Images:          {}", summary.images);
    info!("  Grid:            {0}x{0}", summary.grid_side);
    info!("  Glomeruli:       {}", summary.report.counts.glomeruli);
    info!("  Non-glomeruli:   {}", summary.report.counts.non_glomeruli);
    info!("  Grid image:      {}", summary.report.grid_path.display());
    info!("  Histogram:       {}", summary.report.histogram_path.display());
    info!("  Predictions:     {}", summary.report.predictions_path.display());

    Ok(())
}
