//! Image compositing and annotation.
//!
//! * `grid` - Square-grid compositing of tile batches
//! * `annotate` - Text labels burned onto tiles

pub mod annotate;
pub mod grid;

pub use annotate::{GlyphAnnotator, load_system_font};
pub use grid::{GridCompositor, grid_extent, grid_side_for};
