//! Report artifacts of a folder evaluation.
//!
//! The [`ReportEmitter`] writes, below the configured output directory:
//! - the annotated grid image
//! - the probability histogram
//! - a JSON manifest with one entry per image
//! - optionally, every tile sorted into one folder per predicted class

pub mod histogram;

pub use histogram::ProbabilityHistogram;

use crate::core::batch::{Grid, ImageBatch};
use crate::core::config::{ConfigValidator, ReportConfig};
use crate::core::errors::{EvalError, EvalResult};
use crate::domain::ClassLabel;
use crate::utils::image::save_tile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One classified image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Source file name.
    pub file: String,
    /// Classifier output; see the configured polarity.
    pub probability: f32,
    /// Class after thresholding.
    pub class: ClassLabel,
}

/// Number of images per predicted class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub glomeruli: usize,
    pub non_glomeruli: usize,
}

impl ClassCounts {
    fn add(&mut self, class: ClassLabel) {
        match class {
            ClassLabel::Glomeruli => self.glomeruli += 1,
            ClassLabel::NonGlomeruli => self.non_glomeruli += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.glomeruli + self.non_glomeruli
    }
}

/// Paths of everything a report run wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub grid_path: PathBuf,
    pub histogram_path: PathBuf,
    pub predictions_path: PathBuf,
    /// Root of the per-class folders, when sorting is enabled.
    pub sorted_dir: Option<PathBuf>,
    pub counts: ClassCounts,
}

/// Writes grids, histograms, manifests and per-class folders.
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    config: ReportConfig,
}

impl ReportEmitter {
    /// Creates an emitter after validating its configuration.
    pub fn new(config: ReportConfig) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Thresholds every probability into a class record.
    pub fn predictions(
        &self,
        batch: &ImageBatch,
        probabilities: &[f32],
    ) -> EvalResult<Vec<PredictionRecord>> {
        check_lengths(batch, probabilities)?;
        Ok(batch
            .names()
            .iter()
            .zip(probabilities)
            .map(|(file, &probability)| PredictionRecord {
                file: file.clone(),
                probability,
                class: self
                    .config
                    .polarity
                    .classify(probability, self.config.threshold),
            })
            .collect())
    }

    /// Saves each tile as `<output_dir>/<class>/<stem>.png`.
    pub fn sort_into_folders(
        &self,
        batch: &ImageBatch,
        probabilities: &[f32],
    ) -> EvalResult<ClassCounts> {
        let records = self.predictions(batch, probabilities)?;
        self.write_sorted(batch, &records)
    }

    fn write_sorted(
        &self,
        batch: &ImageBatch,
        records: &[PredictionRecord],
    ) -> EvalResult<ClassCounts> {
        for class in [ClassLabel::Glomeruli, ClassLabel::NonGlomeruli] {
            fs::create_dir_all(self.config.output_dir.join(class.dir_name()))?;
        }

        let mut counts = ClassCounts::default();
        let mut written = HashSet::new();
        for ((name, tile), record) in batch.iter().zip(records) {
            let dir = self.config.output_dir.join(record.class.dir_name());
            let path = unique_png_path(&dir, name, &mut written);
            save_tile(tile, &path)?;
            counts.add(record.class);
        }

        info!(
            "Sorted {} images: {} glomeruli, {} non-glomeruli",
            counts.total(),
            counts.glomeruli,
            counts.non_glomeruli
        );
        Ok(counts)
    }

    /// Renders the probability histogram to the configured file.
    pub fn write_histogram(&self, probabilities: &[f32]) -> EvalResult<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;
        let hist =
            ProbabilityHistogram::from_probabilities(probabilities, self.config.histogram_bins)?;
        let path = self.config.output_dir.join(&self.config.histogram_file);
        hist.save(&path, self.config.histogram_log_scale)?;
        Ok(path)
    }

    /// Writes the JSON predictions manifest.
    pub fn write_predictions(&self, records: &[PredictionRecord]) -> EvalResult<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join(&self.config.predictions_file);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, records)?;
        Ok(path)
    }

    /// Saves a composed grid to the configured file.
    pub fn save_grid(&self, grid: &Grid) -> EvalResult<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join(&self.config.grid_file);
        save_tile(grid, &path)?;
        Ok(path)
    }

    /// Writes every artifact of one evaluation.
    pub fn emit(
        &self,
        batch: &ImageBatch,
        probabilities: &[f32],
        grid: &Grid,
    ) -> EvalResult<ReportSummary> {
        let records = self.predictions(batch, probabilities)?;

        let grid_path = self.save_grid(grid)?;
        let histogram_path = self.write_histogram(probabilities)?;
        let predictions_path = self.write_predictions(&records)?;

        let (sorted_dir, counts) = if self.config.sort_into_folders {
            let counts = self.write_sorted(batch, &records)?;
            (Some(self.config.output_dir.clone()), counts)
        } else {
            let mut counts = ClassCounts::default();
            records.iter().for_each(|r| counts.add(r.class));
            (None, counts)
        };

        info!("Report written to {}", self.config.output_dir.display());
        Ok(ReportSummary {
            grid_path,
            histogram_path,
            predictions_path,
            sorted_dir,
            counts,
        })
    }
}

/// Picks `<dir>/<stem>.png`, or `<dir>/<stem>_<n>.png` with the smallest free
/// `n` when an earlier tile of this run already took the name.
fn unique_png_path(dir: &Path, name: &str, written: &mut HashSet<PathBuf>) -> PathBuf {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());

    let mut path = dir.join(format!("{stem}.png"));
    let mut n = 1;
    while written.contains(&path) {
        path = dir.join(format!("{stem}_{n}.png"));
        n += 1;
    }
    if n > 1 {
        warn!("{} shares its stem with an earlier image; saved as {}", name, path.display());
    }
    written.insert(path.clone());
    path
}

fn check_lengths(batch: &ImageBatch, probabilities: &[f32]) -> EvalResult<()> {
    if batch.len() != probabilities.len() {
        return Err(EvalError::LengthMismatch {
            tiles: batch.len(),
            probabilities: probabilities.len(),
        });
    }
    Ok(())
}
