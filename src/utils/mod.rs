//! Utility functions for loading images and converting them to tiles.

pub mod image;
pub mod loader;

pub use self::image::{
    image_to_tile, load_image, save_tile, tile_to_gray, tile_to_image, tile_to_rgb, u8_to_unit,
    unit_to_u8,
};
pub use loader::ImageLoader;
