//! Image loader configuration.
//!
//! The input geometry a model expects travels in a [`LoaderConfig`] that is
//! handed to the loader explicitly. [`LoaderConfig::for_model_path`] derives
//! it from well-known architecture names in the model file name.

use super::errors::{ConfigError, ConfigValidator};
use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resampling filter used when resizing inputs to the model size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Target geometry of the tiles produced by the image loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Channel depth: 1 for grayscale, 3 for RGB.
    pub depth: u32,
    /// Resampling filter.
    pub filter: ResizeFilter,
    /// Decode in parallel once a folder holds more files than this.
    pub parallel_threshold: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            width: 299,
            height: 299,
            depth: 3,
            filter: ResizeFilter::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl LoaderConfig {
    /// Creates a loader configuration for the given geometry.
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
            ..Self::default()
        }
    }

    /// Picks the input geometry from the architecture named in a model file name.
    ///
    /// `inception` models take 299×299 RGB, `resnet` and `vgg` models 224×224.
    /// Anything else gets the defaults.
    pub fn for_model_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.contains("inception") {
            Self::new(299, 299, 3)
        } else if name.contains("resnet") || name.contains("vgg") {
            Self {
                width: 224,
                height: 224,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

impl ConfigValidator for LoaderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_image_dimensions(self.width, self.height)?;
        if self.depth != 1 && self.depth != 3 {
            return Err(ConfigError::InvalidConfig {
                message: format!("Channel depth must be 1 or 3, got {}", self.depth),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_model_path_architectures() {
        let cfg = LoaderConfig::for_model_path(Path::new("/models/inception_v3_glom.onnx"));
        assert_eq!((cfg.width, cfg.height, cfg.depth), (299, 299, 3));

        let cfg = LoaderConfig::for_model_path(Path::new("ResNet50-final.onnx"));
        assert_eq!((cfg.width, cfg.height), (224, 224));

        let cfg = LoaderConfig::for_model_path(Path::new("vgg16.onnx"));
        assert_eq!((cfg.width, cfg.height), (224, 224));

        let cfg = LoaderConfig::for_model_path(Path::new("model.onnx"));
        assert_eq!(cfg, LoaderConfig::default());
    }

    #[test]
    fn test_architecture_is_read_from_file_name_only() {
        let cfg = LoaderConfig::for_model_path(Path::new("/vgg_runs/model.onnx"));
        assert_eq!(cfg, LoaderConfig::default());
    }

    #[test]
    fn test_validate_depth_and_dimensions() {
        assert!(LoaderConfig::new(64, 64, 1).validate().is_ok());
        assert!(LoaderConfig::new(64, 64, 3).validate().is_ok());
        assert!(LoaderConfig::new(64, 64, 4).validate().is_err());
        assert!(LoaderConfig::new(0, 64, 3).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: LoaderConfig = serde_json::from_str(r#"{"width": 128, "depth": 1}"#).unwrap();
        assert_eq!(cfg.width, 128);
        assert_eq!(cfg.height, 299);
        assert_eq!(cfg.depth, 1);
        assert_eq!(cfg.filter, ResizeFilter::CatmullRom);
    }
}
