//! ONNX Runtime inference.
//!
//! The harness only needs one thing from a model: a probability per tile.
//! [`OnnxClassifier`] provides it for exported binary classifiers.

pub mod onnx;

pub use onnx::{OnnxClassifier, load_session};
