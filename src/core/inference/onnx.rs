//! Binary classifier backed by an ONNX Runtime session.

use crate::core::batch::Tensor4D;
use crate::core::config::{ConfigError, ConfigValidator, InferenceConfig};
use crate::core::errors::{EvalError, EvalResult};
use crate::core::traits::Classifier;
use ndarray::s;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Opens an ONNX model with ORT logging limited to errors.
pub fn load_session(model_path: impl AsRef<Path>) -> EvalResult<Session> {
    let path = model_path.as_ref();
    let session = Session::builder()?
        .with_log_level(LogLevel::Error)?
        .commit_from_file(path)
        .map_err(|e| {
            EvalError::inference_error(
                &model_name(path),
                &format!("failed to create ONNX session from {}", path.display()),
                e,
            )
        })?;
    Ok(session)
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown_model")
        .to_string()
}

/// Runs an exported binary classifier.
///
/// The model must output either one score per image (`[N]` or `[N, 1]`, a
/// sigmoid head) or two (`[N, 2]`, a softmax head, of which the second
/// column is used). Either way the score is the probability of class index 1,
/// so the configured [`Polarity`](crate::domain::Polarity) must name the class
/// the model was trained to encode as 1.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    model_path: PathBuf,
    model_name: String,
    batch_size: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl OnnxClassifier {
    /// Loads the model named by `config.model_path`.
    ///
    /// Tensor names not given in the configuration are taken from the
    /// model's first input and first output.
    pub fn from_config(config: &InferenceConfig) -> EvalResult<Self> {
        config.validate()?;
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| ConfigError::InvalidConfig {
                message: "inference.model_path is required".to_string(),
            })?;
        let session = load_session(path)?;
        let name = model_name(path);

        let input_name = match &config.input_name {
            Some(n) => n.clone(),
            None => session
                .inputs
                .first()
                .map(|i| i.name.clone())
                .ok_or_else(|| EvalError::inference_message(&name, "model declares no inputs"))?,
        };
        let output_name = match &config.output_name {
            Some(n) => n.clone(),
            None => session
                .outputs
                .first()
                .map(|o| o.name.clone())
                .ok_or_else(|| EvalError::inference_message(&name, "model declares no outputs"))?,
        };

        info!(
            "Loaded model '{}' from {} (input '{}', output '{}')",
            name,
            path.display(),
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            model_path: path.to_path_buf(),
            model_name: name,
            batch_size: config.batch_size,
        })
    }

    /// Loads a model with default settings.
    pub fn load(model_path: impl Into<PathBuf>) -> EvalResult<Self> {
        Self::from_config(&InferenceConfig {
            model_path: Some(model_path.into()),
            ..InferenceConfig::default()
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn predict_chunk(&self, chunk: ndarray::ArrayView4<f32>) -> EvalResult<Vec<f32>> {
        let count = chunk.shape()[0];
        let dims: Vec<i64> = chunk.shape().iter().map(|&d| d as i64).collect();
        let data = chunk.to_slice().ok_or_else(|| {
            EvalError::invalid_input("inference tensor is not contiguous in memory")
        })?;
        let input_tensor = TensorRef::from_array_view((dims, data))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let mut session = self.session.lock().map_err(|_| {
            EvalError::inference_message(&self.model_name, "failed to acquire session lock")
        })?;
        let outputs = session.run(inputs).map_err(|e| {
            EvalError::inference_error(&self.model_name, "forward pass failed", e)
        })?;
        let (_, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;

        scores_from_output(data, count)
            .ok_or_else(|| {
                EvalError::inference_message(
                    &self.model_name,
                    format!(
                        "expected 1 or 2 scores per image, got {} values for {} images",
                        data.len(),
                        count
                    ),
                )
            })
    }
}

/// Extracts one probability per image from a flat model output.
fn scores_from_output(data: &[f32], count: usize) -> Option<Vec<f32>> {
    if data.len() == count {
        Some(data.to_vec())
    } else if data.len() == 2 * count {
        Some(data.chunks_exact(2).map(|pair| pair[1]).collect())
    } else {
        None
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: &Tensor4D) -> EvalResult<Vec<f32>> {
        let total = batch.shape()[0];
        let mut scores = Vec::with_capacity(total);

        for start in (0..total).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(total);
            debug!("Running '{}' on images {}..{}", self.model_name, start, end);
            let chunk = batch.slice(s![start..end, .., .., ..]);
            scores.extend(self.predict_chunk(chunk)?);
        }

        Ok(scores)
    }

    fn model_info(&self) -> String {
        format!("{} ({})", self.model_name, self.model_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_from_sigmoid_output() {
        assert_eq!(
            scores_from_output(&[0.1, 0.9, 0.4], 3),
            Some(vec![0.1, 0.9, 0.4])
        );
    }

    #[test]
    fn test_scores_from_softmax_output() {
        assert_eq!(
            scores_from_output(&[0.8, 0.2, 0.3, 0.7], 2),
            Some(vec![0.2, 0.7])
        );
    }

    #[test]
    fn test_unexpected_output_shape() {
        assert_eq!(scores_from_output(&[0.1, 0.2, 0.3], 2), None);
    }

    #[test]
    fn test_missing_model_path() {
        let err = OnnxClassifier::from_config(&InferenceConfig::default()).unwrap_err();
        assert!(matches!(err, EvalError::Config(_)));

        let err = OnnxClassifier::load("/no/such/model.onnx").unwrap_err();
        assert!(matches!(
            err,
            EvalError::Config(ConfigError::ModelPathNotFound { .. })
        ));
    }
}
