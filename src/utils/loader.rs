//! Folder image loader.
//!
//! Reads every readable image in a directory, resizes it to the configured
//! model input size and normalizes it into a [`Tile`]. Files that fail to
//! decode are logged and skipped.

use crate::core::batch::{ImageBatch, Tile};
use crate::core::config::{ConfigValidator, LoaderConfig};
use crate::core::errors::{EvalError, EvalResult};
use crate::utils::image::{image_to_tile, load_image};
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loads folders of images into normalized batches.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    config: LoaderConfig,
}

impl ImageLoader {
    /// Creates a loader after validating its configuration.
    pub fn new(config: LoaderConfig) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Lists the regular files of a directory in file-name order.
    pub fn list_files(dir: &Path) -> EvalResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Decodes, resizes and normalizes a single image file.
    pub fn load_tile(&self, path: &Path) -> EvalResult<Tile> {
        let img = load_image(path)?;
        let resized = img.resize_exact(
            self.config.width,
            self.config.height,
            self.config.filter.into(),
        );
        image_to_tile(&resized, self.config.depth)
    }

    /// Loads every readable image in `dir`.
    ///
    /// Unreadable files are skipped with a warning. Fails with `NoImagesFound`
    /// when nothing could be read.
    pub fn load_folder(&self, dir: &Path) -> EvalResult<ImageBatch> {
        let files = Self::list_files(dir)?;
        info!(
            "Loading {} files from {} at {}x{}x{}",
            files.len(),
            dir.display(),
            self.config.width,
            self.config.height,
            self.config.depth
        );

        let results: Vec<EvalResult<Tile>> = if files.len() > self.config.parallel_threshold {
            files.par_iter().map(|p| self.load_tile(p)).collect()
        } else {
            files.iter().map(|p| self.load_tile(p)).collect()
        };

        let mut batch = ImageBatch::default();
        for (path, result) in files.iter().zip(results) {
            match result {
                Ok(tile) => batch.push(tile, file_name(path)),
                Err(e) => warn!("Could not open image file {}: {}", path.display(), e),
            }
        }

        if batch.is_empty() {
            return Err(EvalError::NoImagesFound {
                dir: dir.to_path_buf(),
            });
        }
        debug!("Loaded {} of {} files", batch.len(), files.len());
        Ok(batch)
    }

    /// Draws `n` files from `dir` uniformly with replacement and loads them.
    ///
    /// Draws that hit an unreadable file are skipped, so the batch may hold
    /// fewer than `n` tiles. Pass a seeded RNG for a reproducible sample.
    pub fn sample_folder<R: Rng + ?Sized>(
        &self,
        dir: &Path,
        n: usize,
        rng: &mut R,
    ) -> EvalResult<ImageBatch> {
        let files = Self::list_files(dir)?;
        let mut batch = ImageBatch::default();

        for _ in 0..n {
            let Some(path) = files.choose(rng) else {
                break;
            };
            match self.load_tile(path) {
                Ok(tile) => batch.push(tile, file_name(path)),
                Err(e) => warn!("Skipping unreadable sample {}: {}", path.display(), e),
            }
        }

        if batch.is_empty() {
            return Err(EvalError::NoImagesFound {
                dir: dir.to_path_buf(),
            });
        }
        Ok(batch)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
