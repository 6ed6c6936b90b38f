//! Linear registration of skeletal CT volumes.
//!
//! [`LinearRegistrationPipeline`] derives bone masks where none are given,
//! restricts both volumes to the bone ROI, estimates an affine transform with
//! [`bonereg_registration::AffineRegistration`] and resamples the full moving
//! volume and mask into the fixed grid.

pub mod config;
pub mod pipeline;
pub mod transform_applier;

pub use config::{PipelineConfig, RoiConfig};
pub use pipeline::{auto_segment, register_linear, LinearRegistrationOutput, LinearRegistrationPipeline};
pub use transform_applier::apply_linear_transform;
pub use bonereg_registration::{RegistrationError, Result};
