//! Grid, report, inference and top-level evaluation configuration.

use super::errors::{ConfigError, ConfigValidator};
use super::loader::LoaderConfig;
use crate::core::constants::{DEFAULT_BATCH_SIZE, DEFAULT_GRID_MARGIN, DEFAULT_HISTOGRAM_BINS};
use crate::domain::Polarity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How tiles are chosen when a batch holds more tiles than the grid has cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Keep the first `G * G` tiles.
    #[default]
    Sequential,
    /// Keep a uniform sample without replacement.
    Random,
}

/// Settings for [`GridCompositor`](crate::processors::GridCompositor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid side length. `None` picks the smallest `G` with `G * G >= N`.
    pub grid_size: Option<usize>,
    /// Black border between adjacent tiles, in pixels.
    pub margin: usize,
    /// Tile selection when the batch overflows the grid.
    pub selection: SelectionMode,
    /// Seed for random selection. Without one, random selection is not reproducible.
    pub seed: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: None,
            margin: DEFAULT_GRID_MARGIN,
            selection: SelectionMode::Sequential,
            seed: None,
        }
    }
}

impl GridConfig {
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = Some(grid_size);
        self
    }

    pub fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl ConfigValidator for GridConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == Some(0) {
            return Err(ConfigError::InvalidConfig {
                message: "Grid size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Where and how the report emitter writes its artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Root directory for all outputs.
    pub output_dir: PathBuf,
    /// File name of the annotated grid image.
    pub grid_file: String,
    /// File name of the probability histogram image.
    pub histogram_file: String,
    /// File name of the JSON predictions manifest.
    pub predictions_file: String,
    /// Number of histogram bins over [0, 1].
    pub histogram_bins: usize,
    /// Draw histogram bars on a logarithmic count axis.
    pub histogram_log_scale: bool,
    /// Copy every tile into a per-class folder.
    pub sort_into_folders: bool,
    /// Probabilities above this map to the positive class.
    pub threshold: f32,
    /// Which class probability 1.0 denotes.
    pub polarity: Polarity,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            grid_file: "grid.png".to_string(),
            histogram_file: "proba_dist.png".to_string(),
            predictions_file: "predictions.json".to_string(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            histogram_log_scale: true,
            sort_into_folders: true,
            threshold: 0.5,
            polarity: Polarity::default(),
        }
    }
}

impl ReportConfig {
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }
}

impl ConfigValidator for ReportConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_threshold(self.threshold)?;
        if self.histogram_bins == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "Histogram needs at least one bin".to_string(),
            });
        }
        for name in [
            &self.grid_file,
            &self.histogram_file,
            &self.predictions_file,
        ] {
            if name.is_empty() {
                return Err(ConfigError::InvalidConfig {
                    message: "Output file names must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Memory layout of the tensor handed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`
    #[default]
    Nhwc,
    /// `[batch, channels, height, width]`
    Nchw,
}

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Serialized model file.
    pub model_path: Option<PathBuf>,
    /// Tiles per forward pass.
    pub batch_size: usize,
    /// Tensor layout the model expects.
    pub layout: TensorLayout,
    /// Input tensor name; discovered from the model when unset.
    pub input_name: Option<String>,
    /// Output tensor name; discovered from the model when unset.
    pub output_name: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            layout: TensorLayout::default(),
            input_name: None,
            output_name: None,
        }
    }
}

impl ConfigValidator for InferenceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size(self.batch_size)?;
        if let Some(path) = &self.model_path {
            self.validate_model_path(path)?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Full configuration of one folder evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Folder of images to evaluate.
    pub input_dir: Option<PathBuf>,
    pub loader: LoaderConfig,
    pub grid: GridConfig,
    pub report: ReportConfig,
    pub inference: InferenceConfig,
    /// Font used for grid labels; system fonts are searched when unset.
    pub font_path: Option<PathBuf>,
}

impl EvalConfig {
    /// Reads a configuration from a JSON file. Missing sections take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, crate::core::EvalError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }
}

impl ConfigValidator for EvalConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.loader.validate()?;
        self.grid.validate()?;
        self.report.validate()?;
        self.inference.validate()
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EvalConfig::get_defaults().validate().is_ok());
        assert_eq!(GridConfig::default().margin, 3);
        assert_eq!(ReportConfig::default().histogram_bins, 100);
    }

    #[test]
    fn test_zero_grid_size_rejected() {
        let cfg = GridConfig::default().with_grid_size(0);
        assert!(cfg.validate().is_err());
        assert!(GridConfig::default().with_grid_size(4).validate().is_ok());
    }

    #[test]
    fn test_report_threshold_range() {
        assert!(ReportConfig::default().with_threshold(1.5).validate().is_err());
        assert!(ReportConfig::default().with_threshold(-0.1).validate().is_err());
        assert!(ReportConfig::default().with_threshold(0.3).validate().is_ok());
    }

    #[test]
    fn test_missing_model_path_rejected() {
        let cfg = InferenceConfig {
            model_path: Some(PathBuf::from("/definitely/not/here.onnx")),
            ..InferenceConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ModelPathNotFound { .. })
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.json");
        std::fs::write(
            &path,
            r#"{
                "input_dir": "/data/test",
                "grid": { "grid_size": 8, "selection": "random", "seed": 9001 },
                "report": { "polarity": "one_is_glomeruli", "threshold": 0.4 },
                "inference": { "layout": "nchw", "batch_size": 16 }
            }"#,
        )
        .unwrap();

        let cfg = EvalConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.input_dir, Some(PathBuf::from("/data/test")));
        assert_eq!(cfg.grid.grid_size, Some(8));
        assert_eq!(cfg.grid.selection, SelectionMode::Random);
        assert_eq!(cfg.grid.seed, Some(9001));
        assert_eq!(cfg.grid.margin, 3);
        assert_eq!(cfg.report.polarity, Polarity::OneIsGlomeruli);
        assert_eq!(cfg.inference.layout, TensorLayout::Nchw);
        assert_eq!(cfg.inference.batch_size, 16);
        assert_eq!(cfg.loader, LoaderConfig::default());
    }
}
