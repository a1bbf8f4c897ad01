//! Error types for the evaluation harness.
//!
//! Composition errors (`ShapeMismatch`, `LengthMismatch`, `EmptyBatch`,
//! `RenderingUnavailable`) are fatal to a single grid call; the caller decides
//! whether to skip the batch or abort the run. The remaining variants wrap the
//! I/O, decoding, configuration and inference failures of the collaborators.

use crate::core::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced anywhere in the load → predict → compose → report flow.
#[derive(Error, Debug)]
pub enum EvalError {
    /// A tile's shape differs from the first tile of the batch.
    #[error("tile {index} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Position of the offending tile in the batch.
        index: usize,
        /// Shape `(height, width, channels)` of the first tile.
        expected: (usize, usize, usize),
        /// Shape of the offending tile.
        actual: (usize, usize, usize),
    },

    /// Probabilities were supplied but do not pair one-to-one with tiles.
    #[error("got {probabilities} probabilities for {tiles} tiles")]
    LengthMismatch {
        /// Number of tiles.
        tiles: usize,
        /// Number of probabilities.
        probabilities: usize,
    },

    /// A grid cannot be sized from zero tiles.
    #[error("cannot compose a grid from an empty batch")]
    EmptyBatch,

    /// Text annotation was requested but no font could be loaded.
    #[error("text rendering unavailable: {reason}")]
    RenderingUnavailable {
        /// Why no renderer is available.
        reason: String,
    },

    /// Error occurred while decoding or encoding an image.
    #[error("image {}", path.display())]
    ImageLoad {
        /// File the error relates to.
        path: PathBuf,
        /// The underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// The input folder holds no readable image.
    #[error("no readable images found in {}", dir.display())]
    NoImagesFound {
        /// The folder that was scanned.
        dir: PathBuf,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration")]
    Config(#[from] ConfigError),

    /// Error raised by the classifier.
    #[error("inference failed for model '{model}': {context}")]
    Inference {
        /// Name of the model that failed.
        model: String,
        /// What the classifier was doing.
        context: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from the ONNX Runtime session.
    #[cfg(feature = "onnx")]
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error while reading or writing JSON.
    #[error("json")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `RenderingUnavailable` error.
    pub fn rendering_unavailable(reason: impl Into<String>) -> Self {
        Self::RenderingUnavailable {
            reason: reason.into(),
        }
    }

    /// Wraps an image codec error with the path it relates to.
    pub fn image_load(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::ImageLoad {
            path: path.into(),
            source,
        }
    }

    /// Creates an inference error with an underlying cause.
    pub fn inference_error(
        model: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model: model.to_string(),
            context: context.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates an inference error that has no underlying cause.
    pub fn inference_message(model: &str, context: impl Into<String>) -> Self {
        Self::Inference {
            model: model.to_string(),
            context: context.into(),
            source: None,
        }
    }
}
