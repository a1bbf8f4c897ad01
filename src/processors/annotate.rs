//! Text annotation of grid tiles.
//!
//! [`GlyphAnnotator`] quantizes a tile to 8 bits, draws a label with
//! `imageproc` and an `ab_glyph` font, and converts the result back to [0, 1].
//! Without a font it fails with `RenderingUnavailable` rather than returning
//! the tile unlabeled.

use crate::core::batch::Tile;
use crate::core::constants::{DEFAULT_LABEL_OFFSET, DEFAULT_LABEL_SCALE};
use crate::core::errors::{EvalError, EvalResult};
use crate::core::traits::TileAnnotator;
use crate::utils::image::{tile_to_gray, tile_to_rgb, u8_to_unit};
use ab_glyph::FontVec;
use image::{Luma, Rgb};
use imageproc::drawing::draw_text_mut;
use ndarray::Array3;
use std::path::Path;
use tracing::{debug, info};

const LABEL_COLOR: Rgb<u8> = Rgb([255, 128, 128]);

const LABEL_LUMA: Luma<u8> = Luma([255]);

const SYSTEM_FONT_PATHS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a system font for text rendering.
pub fn load_system_font() -> Option<FontVec> {
    for path in &SYSTEM_FONT_PATHS {
        if let Ok(font_data) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(font_data)
        {
            debug!("Loaded font from {}", path);
            return Some(font);
        }
    }

    debug!("No system font found");
    None
}

/// Draws labels with an `ab_glyph` font.
///
/// RGB tiles get the label in (255, 128, 128); grayscale tiles in white.
pub struct GlyphAnnotator {
    font: Option<FontVec>,
    scale: f32,
    offset: (i32, i32),
    color: Rgb<u8>,
}

impl std::fmt::Debug for GlyphAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAnnotator")
            .field("font_loaded", &self.font.is_some())
            .field("scale", &self.scale)
            .field("offset", &self.offset)
            .field("color", &self.color)
            .finish()
    }
}

impl GlyphAnnotator {
    /// Creates an annotator drawing with `font`.
    pub fn new(font: FontVec) -> Self {
        Self {
            font: Some(font),
            ..Self::without_font()
        }
    }

    /// Creates an annotator with no font; every `annotate` call fails with
    /// `RenderingUnavailable`.
    pub fn without_font() -> Self {
        Self {
            font: None,
            scale: DEFAULT_LABEL_SCALE,
            offset: DEFAULT_LABEL_OFFSET,
            color: LABEL_COLOR,
        }
    }

    /// Creates an annotator from a font file.
    pub fn from_font_path(font_path: &Path) -> EvalResult<Self> {
        let font_data = std::fs::read(font_path).map_err(|e| {
            EvalError::rendering_unavailable(format!(
                "cannot read font {}: {}",
                font_path.display(),
                e
            ))
        })?;
        let font = FontVec::try_from_vec(font_data).map_err(|_| {
            EvalError::rendering_unavailable(format!(
                "failed to parse font file: {}",
                font_path.display()
            ))
        })?;
        Ok(Self::new(font))
    }

    /// Creates an annotator from the first system font found, or one without
    /// a font if none is installed.
    pub fn with_system_font() -> Self {
        match load_system_font() {
            Some(font) => Self::new(font),
            None => Self::without_font(),
        }
    }

    /// Uses `font_path` when given and readable, otherwise falls back to a
    /// system font.
    pub fn from_optional_path(font_path: Option<&Path>) -> Self {
        match font_path {
            Some(path) => Self::from_font_path(path)
                .inspect(|_| info!("Using custom font: {}", path.display()))
                .unwrap_or_else(|e| {
                    info!("{}. Falling back to system font", e);
                    Self::with_system_font()
                }),
            None => Self::with_system_font(),
        }
    }

    /// Whether a font is loaded.
    pub fn is_available(&self) -> bool {
        self.font.is_some()
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset = (x, y);
        self
    }

    pub fn with_color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }
}

impl TileAnnotator for GlyphAnnotator {
    fn annotate(&self, tile: &Tile, text: &str) -> EvalResult<Tile> {
        let Some(ref font) = self.font else {
            return Err(EvalError::rendering_unavailable(
                "no font loaded; install a system font or configure a font path",
            ));
        };

        let (height, width, channels) = tile.dim();
        let (x, y) = self.offset;
        let raw = match channels {
            1 => {
                let mut img = tile_to_gray(tile)?;
                draw_text_mut(&mut img, LABEL_LUMA, x, y, self.scale, font, text);
                img.into_raw()
            }
            3 => {
                let mut img = tile_to_rgb(tile)?;
                draw_text_mut(&mut img, self.color, x, y, self.scale, font, text);
                img.into_raw()
            }
            other => {
                return Err(EvalError::invalid_input(format!(
                    "cannot annotate a {}-channel tile",
                    other
                )));
            }
        };

        let data: Vec<f32> = raw.into_iter().map(u8_to_unit).collect();
        Ok(Array3::from_shape_vec((height, width, channels), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Annotator with a system font, or `None` after reporting the skipped test.
    fn system_annotator(test: &str) -> Option<GlyphAnnotator> {
        let annotator = GlyphAnnotator::with_system_font();
        if annotator.is_available() {
            Some(annotator)
        } else {
            eprintln!(
                "SKIPPED {test}: no system font in {:?}",
                SYSTEM_FONT_PATHS
            );
            None
        }
    }

    #[test]
    fn test_missing_font_fails_loudly() {
        let annotator = GlyphAnnotator::without_font();
        assert!(!annotator.is_available());

        let tile = Tile::zeros((32, 32, 3));
        let err = annotator.annotate(&tile, "87.700%").unwrap_err();
        assert!(matches!(err, EvalError::RenderingUnavailable { .. }));
    }

    #[test]
    fn test_unreadable_font_path() {
        let err = GlyphAnnotator::from_font_path(Path::new("/no/such/font.ttf")).unwrap_err();
        assert!(matches!(err, EvalError::RenderingUnavailable { .. }));

        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();
        let err = GlyphAnnotator::from_font_path(&bogus).unwrap_err();
        assert!(matches!(err, EvalError::RenderingUnavailable { .. }));
    }

    #[test]
    fn test_annotate_draws_on_a_copy() {
        let Some(annotator) = system_annotator("test_annotate_draws_on_a_copy") else {
            return;
        };

        let tile = Tile::zeros((64, 64, 3));
        let annotated = annotator.annotate(&tile, "50.000%").unwrap();

        assert_eq!(annotated.dim(), tile.dim());
        assert!(tile.iter().all(|&v| v == 0.0));
        assert!(annotated.iter().any(|&v| v > 0.0));
        // Nothing lands above or left of the label offset.
        assert!(annotated.slice(ndarray::s![..5, .., ..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_annotate_grayscale_tile() {
        let Some(annotator) = system_annotator("test_annotate_grayscale_tile") else {
            return;
        };

        let tile = Tile::zeros((48, 48, 1));
        let annotated = annotator.annotate(&tile, "0.000%").unwrap();
        assert_eq!(annotated.dim(), (48, 48, 1));
        assert!(annotated.iter().any(|&v| v > 0.0));
    }
}
