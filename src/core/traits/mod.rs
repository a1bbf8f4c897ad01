//! Trait seams of the evaluation flow.
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ImageLoader  │───▶│Classifier   │───▶│GridCompositor│───▶│ReportEmitter │
//! │             │    │             │    │  └ TileAnno- │    │              │
//! │• load_folder│    │• predict    │    │    tator     │    │• emit        │
//! └─────────────┘    └─────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! [`Classifier`] is implemented by `OnnxClassifier`, [`TileAnnotator`] by
//! `GlyphAnnotator`.

use crate::core::batch::{Tensor4D, Tile};
use crate::core::errors::EvalResult;
use std::fmt::Debug;

/// A binary classifier producing one probability per input tile.
///
/// Implementations must document their [`Polarity`](crate::domain::Polarity):
/// which class a probability of 1.0 denotes.
pub trait Classifier: Send + Sync + Debug {
    /// Runs inference over a batch tensor and returns one probability in
    /// [0, 1] per batch entry, in batch order.
    fn predict(&self, batch: &Tensor4D) -> EvalResult<Vec<f32>>;

    /// Short human-readable description of the model.
    fn model_info(&self) -> String;
}

/// Burns a text label onto a copy of a tile.
pub trait TileAnnotator: Send + Sync + Debug {
    /// Returns a new tile with `text` drawn on it. The input is never mutated.
    ///
    /// Fails with `RenderingUnavailable` when no text renderer is available;
    /// implementations must not silently return the tile unchanged.
    fn annotate(&self, tile: &Tile, text: &str) -> EvalResult<Tile>;
}
