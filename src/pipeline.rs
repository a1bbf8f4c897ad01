//! End-to-end folder evaluation.
//!
//! Load → predict → compose → report, wired from an [`EvalConfig`].

use crate::core::batch::ImageBatch;
use crate::core::config::{ConfigValidator, EvalConfig, TensorLayout};
use crate::core::errors::{EvalError, EvalResult};
use crate::core::traits::{Classifier, TileAnnotator};
use crate::processors::{GlyphAnnotator, GridCompositor};
use crate::report::{ReportEmitter, ReportSummary};
use crate::utils::ImageLoader;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Outcome of evaluating one folder.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    /// Number of images that were read and classified.
    pub images: usize,
    /// Side length of the composed grid.
    pub grid_side: usize,
    /// Classifier output per image, in file-name order.
    pub probabilities: Vec<f32>,
    pub report: ReportSummary,
}

/// Runs a classifier over image folders and writes the reports.
#[derive(Debug)]
pub struct FolderEvaluator<C: Classifier, A: TileAnnotator = GlyphAnnotator> {
    loader: ImageLoader,
    classifier: C,
    compositor: GridCompositor<A>,
    emitter: ReportEmitter,
    layout: TensorLayout,
}

impl<C: Classifier, A: TileAnnotator> FolderEvaluator<C, A> {
    /// Builds every stage from `config`.
    pub fn new(config: &EvalConfig, classifier: C, annotator: A) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self {
            loader: ImageLoader::new(config.loader.clone())?,
            classifier,
            compositor: GridCompositor::new(config.grid.clone(), annotator)?,
            emitter: ReportEmitter::new(config.report.clone())?,
            layout: config.inference.layout,
        })
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classifies every tile of a batch, checking one score comes back per tile.
    pub fn classify(&self, batch: &ImageBatch) -> EvalResult<Vec<f32>> {
        let tensor = batch.to_tensor(self.layout)?;
        let probabilities = self.classifier.predict(&tensor)?;
        if probabilities.len() != batch.len() {
            return Err(EvalError::inference_message(
                &self.classifier.model_info(),
                format!(
                    "returned {} scores for {} images",
                    probabilities.len(),
                    batch.len()
                ),
            ));
        }
        Ok(probabilities)
    }

    /// Evaluates every readable image in `dir`.
    pub fn evaluate(&self, dir: &Path) -> EvalResult<EvaluationSummary> {
        let start = Instant::now();
        let batch = self.loader.load_folder(dir)?;

        info!(
            "Classifying {} images with {}",
            batch.len(),
            self.classifier.model_info()
        );
        let probabilities = self.classify(&batch)?;

        let grid = self
            .compositor
            .compose(batch.tiles(), Some(probabilities.as_slice()))?;
        let report = self.emitter.emit(&batch, &probabilities, &grid)?;

        info!(
            "Evaluated {} images in {:.2?}",
            batch.len(),
            start.elapsed()
        );
        Ok(EvaluationSummary {
            images: batch.len(),
            grid_side: self.compositor.side_for(batch.len()),
            probabilities,
            report,
        })
    }
}
