//! Similarity metric used by the affine registration.

pub mod trait_;
pub mod histogram;
pub mod gradient;
pub mod mutual_information;

pub use trait_::{Metric, MetricEvaluation};
pub use histogram::{IntensityRange, ParzenJointHistogram};
pub use gradient::ImageGradient;
pub use mutual_information::{select_fixed_samples, MattesMutualInformation, MetricMasks, MetricSettings};
