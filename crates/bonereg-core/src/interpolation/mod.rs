//! Interpolation of voxel data at continuous indices.

pub mod trait_;
pub mod linear;
pub mod nearest;

pub use trait_::{InterpolationMode, Interpolator};
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
