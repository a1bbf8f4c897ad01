//! # Glomeruli Eval
//!
//! An evaluation harness for binary glomeruli / non-glomeruli image classifiers.
//! A folder of tiles is loaded, classified, and summarized as an annotated
//! grid image, a probability histogram and per-class output folders.
//!
//! ## Features
//!
//! - Folder loading with resizing to the classifier input size
//! - Grid composition with sequential or random tile selection
//! - Per-tile confidence labels rendered with a TrueType font
//! - Probability histograms on a log-scaled count axis
//! - ONNX Runtime integration (`onnx` feature)
//! - An `evaluate-folder` command line driver (`cli` feature)
//!
//! ## Modules
//!
//! * [`core`] - Tile types, configuration, error handling and the classifier seam
//! * [`domain`] - Class labels and output polarity
//! * [`pipeline`] - End-to-end folder evaluation
//! * [`processors`] - Grid composition and text annotation
//! * [`report`] - Grid, histogram and manifest output
//! * [`utils`] - Image conversion and folder loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glomeruli_eval::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = ImageLoader::new(LoaderConfig::new(64, 64, 3))?;
//! let batch = loader.load_folder(Path::new("tiles/"))?;
//!
//! // Scores would normally come from a `Classifier`.
//! let probabilities = vec![0.25; batch.len()];
//!
//! let compositor = GridCompositor::new(GridConfig::default(), GlyphAnnotator::with_system_font())?;
//! let grid = compositor.compose(batch.tiles(), Some(probabilities.as_slice()))?;
//!
//! let emitter = ReportEmitter::new(ReportConfig::default().with_output_dir("report"))?;
//! emitter.emit(&batch, &probabilities, &grid)?;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;

pub mod pipeline;
pub mod processors;
pub mod report;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use glomeruli_eval::prelude::*;
/// ```
///
/// Trait implementations, histogram internals and the ONNX session helpers
/// are imported from their modules directly.
pub mod prelude {
    pub use crate::core::{
        Classifier, EvalConfig, EvalError, EvalResult, GridConfig, ImageBatch, LoaderConfig,
        ReportConfig, SelectionMode, Tile, TileAnnotator,
    };
    pub use crate::domain::{ClassLabel, Polarity, confidence_label};
    pub use crate::pipeline::{EvaluationSummary, FolderEvaluator};
    pub use crate::processors::{GlyphAnnotator, GridCompositor};
    pub use crate::report::{ReportEmitter, ReportSummary};
    pub use crate::utils::{ImageLoader, load_image};

    #[cfg(feature = "onnx")]
    pub use crate::core::OnnxClassifier;
}
