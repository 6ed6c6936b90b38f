//! Spatial transforms.

pub mod trait_;
pub mod affine;
pub mod parametric;

pub use trait_::Transform;
pub use affine::AffineTransform;
pub use parametric::ParametricAffineTransform;
