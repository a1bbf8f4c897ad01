//! Class polarity contract between the classifier and the reports.
//!
//! A binary classifier emits one probability per tile. Which class a value of
//! 1.0 denotes depends on how the model was trained, and getting it backwards
//! silently inverts every label in the reports. [`Polarity`] makes that mapping
//! explicit.
//!
//! The grid label is always `100 - p * 100`, i.e. the percent confidence of the
//! class encoded as 0. Under the default [`Polarity::OneIsNonGlomeruli`] this is
//! the confidence that a tile shows a glomerulus.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two classes the harness reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    Glomeruli,
    NonGlomeruli,
}

impl ClassLabel {
    /// Name of the output folder tiles of this class are sorted into.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ClassLabel::Glomeruli => "glomeruli",
            ClassLabel::NonGlomeruli => "nonglomeruli",
        }
    }

    /// The other class.
    pub fn opposite(&self) -> Self {
        match self {
            ClassLabel::Glomeruli => ClassLabel::NonGlomeruli,
            ClassLabel::NonGlomeruli => ClassLabel::Glomeruli,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Which class a classifier probability of 1.0 denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// 0 is glomeruli, 1 is non-glomeruli. This is how the reference models
    /// were trained.
    #[default]
    OneIsNonGlomeruli,
    /// 0 is non-glomeruli, 1 is glomeruli.
    OneIsGlomeruli,
}

impl Polarity {
    /// The class encoded by probability 1.0.
    pub fn positive_class(&self) -> ClassLabel {
        match self {
            Polarity::OneIsNonGlomeruli => ClassLabel::NonGlomeruli,
            Polarity::OneIsGlomeruli => ClassLabel::Glomeruli,
        }
    }

    /// The class encoded by probability 0.0, whose confidence the grid label shows.
    pub fn negative_class(&self) -> ClassLabel {
        self.positive_class().opposite()
    }

    /// Thresholds a probability into a class.
    ///
    /// Values strictly above `threshold` map to the positive class, so a tie at
    /// 0.5 falls to the negative class like round-half-to-even does.
    pub fn classify(&self, probability: f32, threshold: f32) -> ClassLabel {
        if probability > threshold {
            self.positive_class()
        } else {
            self.negative_class()
        }
    }
}

/// Formats the label drawn on a grid tile: `100 - p * 100` with three decimals
/// and a `%` suffix.
///
/// The arithmetic runs in `f64` on the widened probability, not in `f32`. A
/// value whose percentage lies within `f32` rounding error of a `.0005`
/// boundary can therefore differ in the third decimal from an `f32`
/// computation. The `f64` result is the one closer to the exact percentage of
/// the given `f32`.
pub fn confidence_label(probability: f32) -> String {
    let percent = 100.0 - f64::from(probability) * 100.0;
    // -0.0 would print as "-0.000%"
    format!("{:.3}%", percent + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_label_uses_widened_probability() {
        // 0.0005_f32 is 0.000500000023..., so the percentage is just below 99.95
        assert_eq!(confidence_label(0.0005), "99.950%");
        assert_eq!(confidence_label(0.25), "75.000%");
        assert_eq!(confidence_label(0.999), "0.100%");
    }

    #[test]
    fn test_confidence_label_format() {
        assert_eq!(confidence_label(0.123), "87.700%");
        assert_eq!(confidence_label(1.0), "0.000%");
        assert_eq!(confidence_label(0.0), "100.000%");
        assert_eq!(confidence_label(0.5), "50.000%");
    }

    #[test]
    fn test_default_polarity_matches_reference_models() {
        let polarity = Polarity::default();
        assert_eq!(polarity.positive_class(), ClassLabel::NonGlomeruli);
        assert_eq!(polarity.negative_class(), ClassLabel::Glomeruli);
        assert_eq!(polarity.classify(0.9, 0.5), ClassLabel::NonGlomeruli);
        assert_eq!(polarity.classify(0.1, 0.5), ClassLabel::Glomeruli);
    }

    #[test]
    fn test_classify_tie_goes_to_negative_class() {
        assert_eq!(
            Polarity::OneIsNonGlomeruli.classify(0.5, 0.5),
            ClassLabel::Glomeruli
        );
        assert_eq!(
            Polarity::OneIsGlomeruli.classify(0.5, 0.5),
            ClassLabel::NonGlomeruli
        );
    }

    #[test]
    fn test_polarity_serde_names() {
        let json = serde_json::to_string(&Polarity::OneIsGlomeruli).unwrap();
        assert_eq!(json, "\"one_is_glomeruli\"");
        let parsed: Polarity = serde_json::from_str("\"one_is_non_glomeruli\"").unwrap();
        assert_eq!(parsed, Polarity::OneIsNonGlomeruli);
    }
}
