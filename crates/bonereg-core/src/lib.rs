//! Core image types and filters for CT bone registration.
//!
//! Images are burn tensors with physical geometry attached. The filters cover
//! everything the registration pipeline needs around the optimiser itself:
//! threshold segmentation, morphology, component cleaning, cropping,
//! resampling and downsampling.

pub mod error;
pub mod image;
pub mod spatial;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use error::{ImageError, Result};
pub use image::{BoundingBox, Image, ImageMetadata, PixelType};
pub use spatial::{Direction, Point, Spacing, Vector};
pub use transform::AffineTransform;
