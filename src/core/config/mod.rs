//! Configuration types for the evaluation harness.
//!
//! Every section deserializes from JSON with per-field defaults and implements
//! [`ConfigValidator`].

pub mod errors;
pub mod eval;
pub mod loader;

pub use errors::{ConfigError, ConfigValidator};
pub use eval::{
    EvalConfig, GridConfig, InferenceConfig, ReportConfig, SelectionMode, TensorLayout,
};
pub use loader::{LoaderConfig, ResizeFilter};
