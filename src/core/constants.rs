//! Default values shared across the crate.

/// Folders with more files than this are decoded in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Black border between grid tiles, in pixels.
pub const DEFAULT_GRID_MARGIN: usize = 3;

/// Tiles per classifier forward pass.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Bins of the probability histogram.
pub const DEFAULT_HISTOGRAM_BINS: usize = 100;

/// Pixel offset of grid labels from the tile's top-left corner.
pub const DEFAULT_LABEL_OFFSET: (i32, i32) = (10, 10);

/// Font size of grid labels, in pixels.
pub const DEFAULT_LABEL_SCALE: f32 = 16.0;
