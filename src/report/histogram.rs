//! Probability distribution histogram.
//!
//! Probabilities are binned over [0, 1] and drawn as a bar chart with
//! `imageproc`. With a log-scaled count axis a handful of uncertain tiles
//! remains visible next to the large, confident bins.

use crate::core::errors::{EvalError, EvalResult};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::warn;

const BAR_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const AXIS_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const CANVAS_WIDTH: u32 = 800;
const CANVAS_HEIGHT: u32 = 480;
const PLOT_MARGIN: u32 = 30;

/// Counts of probabilities per equal-width bin over [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityHistogram {
    counts: Vec<usize>,
    skipped: usize,
}

impl ProbabilityHistogram {
    /// Bins `probabilities` into `bins` buckets.
    ///
    /// Values outside [0, 1] are clamped into the edge bins; 1.0 falls into
    /// the last bin. Non-finite values are counted as skipped.
    pub fn from_probabilities(probabilities: &[f32], bins: usize) -> EvalResult<Self> {
        if bins == 0 {
            return Err(EvalError::invalid_input("histogram needs at least one bin"));
        }

        let mut counts = vec![0usize; bins];
        let mut skipped = 0;
        for &p in probabilities {
            if !p.is_finite() {
                skipped += 1;
                continue;
            }
            let index = ((p.clamp(0.0, 1.0) * bins as f32) as usize).min(bins - 1);
            counts[index] += 1;
        }

        if skipped > 0 {
            warn!("Skipped {} non-finite probabilities in histogram", skipped);
        }
        Ok(Self { counts, skipped })
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Number of binned values.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Number of non-finite values left out.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Lower and upper edge of bin `index`.
    pub fn bin_edges(&self, index: usize) -> (f32, f32) {
        let width = 1.0 / self.bins() as f32;
        (index as f32 * width, (index + 1) as f32 * width)
    }

    /// Height of bin `index` as a fraction of the tallest bin.
    fn relative_height(&self, index: usize, log_scale: bool) -> f32 {
        let max = self.max_count();
        let count = self.counts[index];
        if max == 0 || count == 0 {
            return 0.0;
        }
        if log_scale {
            (count as f32).ln_1p() / (max as f32).ln_1p()
        } else {
            count as f32 / max as f32
        }
    }

    /// Draws the histogram as a bar chart.
    pub fn render(&self, log_scale: bool) -> RgbImage {
        let mut img = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND_COLOR);

        let left = PLOT_MARGIN as f32;
        let bottom = (CANVAS_HEIGHT - PLOT_MARGIN) as f32;
        let plot_width = (CANVAS_WIDTH - 2 * PLOT_MARGIN) as f32;
        let plot_height = (CANVAS_HEIGHT - 2 * PLOT_MARGIN) as f32;
        let bar_width = plot_width / self.bins() as f32;

        for index in 0..self.bins() {
            let height = (self.relative_height(index, log_scale) * plot_height).round() as u32;
            if height == 0 {
                continue;
            }
            let x0 = (left + index as f32 * bar_width).round() as i32;
            let x1 = (left + (index + 1) as f32 * bar_width).round() as i32;
            let width = (x1 - x0).max(1) as u32;
            let top = bottom as i32 - height as i32;
            draw_filled_rect_mut(
                &mut img,
                Rect::at(x0, top).of_size(width, height),
                BAR_COLOR,
            );
        }

        draw_line_segment_mut(
            &mut img,
            (left, bottom),
            (left + plot_width, bottom),
            AXIS_COLOR,
        );
        draw_line_segment_mut(
            &mut img,
            (left, bottom),
            (left, bottom - plot_height),
            AXIS_COLOR,
        );

        img
    }

    /// Renders the histogram and writes it to `path`.
    pub fn save(&self, path: &Path, log_scale: bool) -> EvalResult<()> {
        self.render(log_scale)
            .save(path)
            .map_err(|e| EvalError::image_load(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning_edges() {
        let hist =
            ProbabilityHistogram::from_probabilities(&[0.0, 0.05, 0.1, 0.55, 0.999, 1.0], 10)
                .unwrap();
        assert_eq!(hist.bins(), 10);
        assert_eq!(hist.counts()[0], 2);
        assert_eq!(hist.counts()[1], 1);
        assert_eq!(hist.counts()[5], 1);
        assert_eq!(hist.counts()[9], 2);
        assert_eq!(hist.total(), 6);
        assert_eq!(hist.max_count(), 2);
        let (lo, hi) = hist.bin_edges(5);
        assert!((lo - 0.5).abs() < 1e-6 && (hi - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_and_nan() {
        let hist =
            ProbabilityHistogram::from_probabilities(&[-0.5, 1.5, f32::NAN, f32::INFINITY], 4)
                .unwrap();
        assert_eq!(hist.counts(), &[1, 0, 0, 1]);
        assert_eq!(hist.skipped(), 2);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(ProbabilityHistogram::from_probabilities(&[0.5], 0).is_err());
    }

    #[test]
    fn test_log_scale_lifts_small_bins() {
        let mut probabilities = vec![0.95; 1000];
        probabilities.push(0.05);
        let hist = ProbabilityHistogram::from_probabilities(&probabilities, 10).unwrap();

        let linear = hist.relative_height(0, false);
        let log = hist.relative_height(0, true);
        assert!(log > linear);
        assert_eq!(hist.relative_height(9, true), 1.0);
        assert_eq!(hist.relative_height(4, true), 0.0);
    }

    #[test]
    fn test_render_draws_bars() {
        let hist = ProbabilityHistogram::from_probabilities(&[0.02, 0.02, 0.98], 100).unwrap();
        let img = hist.render(true);
        assert_eq!(img.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));

        let blue = img.pixels().filter(|p| **p == BAR_COLOR).count();
        assert!(blue > 0);
        // The tallest bar reaches the top of the plot area.
        let x = PLOT_MARGIN + 2 * (CANVAS_WIDTH - 2 * PLOT_MARGIN) / 100 + 2;
        assert_eq!(img.get_pixel(x, PLOT_MARGIN + 1), &BAR_COLOR);
    }

    #[test]
    fn test_empty_histogram_renders_axes_only() {
        let hist = ProbabilityHistogram::from_probabilities(&[], 10).unwrap();
        let img = hist.render(false);
        assert!(!img.pixels().any(|p| *p == BAR_COLOR));
        assert!(img.pixels().any(|p| *p == AXIS_COLOR));
    }
}
