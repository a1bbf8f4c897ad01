//! Conversions between decoded images and normalized tiles.
//!
//! Tiles hold `f32` intensities in [0, 1]; images on disk are 8-bit. Going to
//! 8 bits clamps and truncates (`(v * 255) as u8`), going back divides by 255.

use crate::core::batch::Tile;
use crate::core::errors::{EvalError, EvalResult};
use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage};
use ndarray::Array3;
use std::path::Path;

/// Converts a normalized intensity to 8 bits.
#[inline]
pub fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Converts an 8-bit intensity to [0, 1].
#[inline]
pub fn u8_to_unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Opens an image file with any format supported by the image crate.
pub fn load_image(path: &Path) -> EvalResult<DynamicImage> {
    image::open(path).map_err(|e| EvalError::image_load(path, e))
}

/// Converts a decoded image into a tile with the given channel depth.
///
/// Depth 1 converts to luma, depth 3 to RGB; alpha is dropped.
pub fn image_to_tile(img: &DynamicImage, depth: u32) -> EvalResult<Tile> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let raw = match depth {
        1 => img.to_luma8().into_raw(),
        3 => img.to_rgb8().into_raw(),
        other => {
            return Err(EvalError::invalid_input(format!(
                "channel depth must be 1 or 3, got {}",
                other
            )));
        }
    };
    let data: Vec<f32> = raw.into_iter().map(u8_to_unit).collect();
    Ok(Array3::from_shape_vec(
        (height, width, depth as usize),
        data,
    )?)
}

/// Quantizes a tile into an 8-bit grayscale image. The tile must have one channel.
pub fn tile_to_gray(tile: &Tile) -> EvalResult<GrayImage> {
    let (height, width, channels) = tile.dim();
    if channels != 1 {
        return Err(EvalError::invalid_input(format!(
            "expected a 1-channel tile, got {} channels",
            channels
        )));
    }
    buffer_from_tile(tile, width, height)
}

/// Quantizes a tile into an 8-bit RGB image. The tile must have three channels.
pub fn tile_to_rgb(tile: &Tile) -> EvalResult<RgbImage> {
    let (height, width, channels) = tile.dim();
    if channels != 3 {
        return Err(EvalError::invalid_input(format!(
            "expected a 3-channel tile, got {} channels",
            channels
        )));
    }
    buffer_from_tile(tile, width, height)
}

fn buffer_from_tile<P>(tile: &Tile, width: usize, height: usize) -> EvalResult<ImageBuffer<P, Vec<u8>>>
where
    P: image::Pixel<Subpixel = u8>,
{
    // iter() walks in logical (row-major) order regardless of memory layout
    let raw: Vec<u8> = tile.iter().copied().map(unit_to_u8).collect();
    ImageBuffer::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| EvalError::invalid_input("tile buffer does not match its dimensions"))
}

/// Quantizes a tile (or grid) into an image of matching channel depth.
pub fn tile_to_image(tile: &Tile) -> EvalResult<DynamicImage> {
    match tile.dim().2 {
        1 => Ok(DynamicImage::ImageLuma8(tile_to_gray(tile)?)),
        3 => Ok(DynamicImage::ImageRgb8(tile_to_rgb(tile)?)),
        other => Err(EvalError::invalid_input(format!(
            "cannot encode a {}-channel tile",
            other
        ))),
    }
}

/// Writes a tile (or grid) to disk; the format follows the file extension.
pub fn save_tile(tile: &Tile, path: &Path) -> EvalResult<()> {
    tile_to_image(tile)?
        .save(path)
        .map_err(|e| EvalError::image_load(path, e))
}
