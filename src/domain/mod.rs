//! Domain-level types shared across the harness.

pub mod polarity;

pub use polarity::{ClassLabel, Polarity, confidence_label};
