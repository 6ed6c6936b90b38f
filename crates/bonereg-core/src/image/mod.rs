//! Images, their geometry and index-space regions.

pub mod image;
pub mod metadata;
pub mod grid;
pub mod pixel;
pub mod region;

pub use image::Image;
pub use metadata::ImageMetadata;
pub use grid::{generate_grid, generate_grid_range, grid_from_flat_indices};
pub use pixel::PixelType;
pub use region::BoundingBox;
