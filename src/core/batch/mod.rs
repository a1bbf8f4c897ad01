//! Tiles, batches and the tensors handed to the classifier.

use crate::core::config::TensorLayout;
use crate::core::errors::{EvalError, EvalResult};
use ndarray::{Array3, Array4, ArrayView3, Axis};

/// One normalized image, shape `(height, width, channels)`, values in [0, 1].
pub type Tile = Array3<f32>;

/// A composed grid image, same layout as a [`Tile`].
pub type Grid = Array3<f32>;

/// A 4-dimensional tensor represented as a 4D array of f32 values.
pub type Tensor4D = Array4<f32>;

/// Checks that every tile matches the first one and that the channel depth
/// is 1 or 3. Returns the common `(height, width, channels)`.
pub fn uniform_shape(tiles: &[Tile]) -> EvalResult<(usize, usize, usize)> {
    let first = tiles.first().ok_or(EvalError::EmptyBatch)?;
    let expected = first.dim();

    for (index, tile) in tiles.iter().enumerate().skip(1) {
        let actual = tile.dim();
        if actual != expected {
            return Err(EvalError::ShapeMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    let channels = expected.2;
    if channels != 1 && channels != 3 {
        return Err(EvalError::invalid_input(format!(
            "tiles must have 1 or 3 channels, got {}",
            channels
        )));
    }
    if expected.0 == 0 || expected.1 == 0 {
        return Err(EvalError::invalid_input("tiles must not be zero-sized"));
    }

    Ok(expected)
}

/// An ordered batch of tiles with the file names they were loaded from.
#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    tiles: Vec<Tile>,
    names: Vec<String>,
}

impl ImageBatch {
    /// Creates a batch, checking that there is one name per tile.
    pub fn new(tiles: Vec<Tile>, names: Vec<String>) -> EvalResult<Self> {
        if tiles.len() != names.len() {
            return Err(EvalError::invalid_input(format!(
                "{} tiles but {} names",
                tiles.len(),
                names.len()
            )));
        }
        Ok(Self { tiles, names })
    }

    pub fn push(&mut self, tile: Tile, name: impl Into<String>) {
        self.tiles.push(tile);
        self.names.push(name.into());
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterates over `(name, tile)` pairs in batch order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tile)> + '_ {
        self.names.iter().map(String::as_str).zip(self.tiles.iter())
    }

    pub fn into_parts(self) -> (Vec<Tile>, Vec<String>) {
        (self.tiles, self.names)
    }

    /// Stacks the tiles into one tensor in the requested layout.
    pub fn to_tensor(&self, layout: TensorLayout) -> EvalResult<Tensor4D> {
        stack_tiles(&self.tiles, layout)
    }
}

/// Stacks equally-shaped tiles along a new leading batch axis.
pub fn stack_tiles(tiles: &[Tile], layout: TensorLayout) -> EvalResult<Tensor4D> {
    uniform_shape(tiles)?;
    let views: Vec<ArrayView3<f32>> = tiles.iter().map(|t| t.view()).collect();
    let nhwc = ndarray::stack(Axis(0), &views)?;

    Ok(match layout {
        TensorLayout::Nhwc => nhwc,
        TensorLayout::Nchw => nhwc
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .into_owned(),
    })
}
