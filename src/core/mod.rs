//! The core module of the evaluation harness.
//!
//! This module contains the fundamental pieces shared by every component:
//! - Tile, grid and tensor types
//! - Configuration management
//! - Constants used throughout the crate
//! - Error handling
//! - ONNX Runtime inference (`onnx` feature)
//! - Traits at the classifier and annotator seams

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
#[cfg(feature = "onnx")]
pub mod inference;
pub mod traits;

pub use batch::{Grid, ImageBatch, Tensor4D, Tile, stack_tiles, uniform_shape};
pub use config::{
    ConfigError, ConfigValidator, EvalConfig, GridConfig, InferenceConfig, LoaderConfig,
    ReportConfig, ResizeFilter, SelectionMode, TensorLayout,
};
pub use constants::*;
pub use errors::{EvalError, EvalResult};
#[cfg(feature = "onnx")]
pub use inference::{OnnxClassifier, load_session};
pub use traits::{Classifier, TileAnnotator};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
