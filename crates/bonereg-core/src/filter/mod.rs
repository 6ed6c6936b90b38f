//! Image filters.

pub(crate) mod voxel_grid;
pub mod threshold;
pub mod morphology;
pub mod connected_component;
pub mod label_statistics;
pub mod mask_cleaning;
pub mod segmentation;
pub mod region_of_interest;
pub mod resample;
pub mod downsample;
pub mod label_overlap;

pub use threshold::BinaryThresholdFilter;
pub use morphology::{BinaryFillholeFilter, BinaryMorphologicalClosingFilter, StructuringElement};
pub use connected_component::ConnectedComponentFilter;
pub use label_statistics::{LabelShape, LabelStatistics};
pub use mask_cleaning::{CleaningConfig, MaskCleaningFilter};
pub use segmentation::{HuThresholdSegmenter, SegmentationConfig};
pub use region_of_interest::{LateralCropper, LateralSide, RoiExtractor};
pub use resample::{inside_domain, ResampleImageFilter};
pub use downsample::DownsampleFilter;
pub use label_overlap::dice_coefficient;
