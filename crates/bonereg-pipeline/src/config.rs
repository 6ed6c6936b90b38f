//! Pipeline configuration.
//!
//! Every struct is serde-(de)serialisable and fills missing fields with
//! defaults, so a partial JSON or TOML document is a valid configuration.

use serde::{Deserialize, Serialize};
use bonereg_core::filter::{CleaningConfig, DownsampleFilter, HuThresholdSegmenter, LateralSide, MaskCleaningFilter, SegmentationConfig};
use bonereg_registration::{RegistrationConfig, Result};

/// Region-of-interest cropping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Voxel margin around the mask bounding box.
    pub pad: usize,
    /// Labels that define the ROI; every nonzero label when `None`.
    pub labels: Option<Vec<u32>>,
    /// Half kept when a mask had to be generated.
    pub lateral_side: LateralSide,
    /// Overlap across the midline in voxels.
    pub lateral_pad: usize,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            pad: 10,
            labels: None,
            lateral_side: LateralSide::Right,
            lateral_pad: 10,
        }
    }
}

impl RoiConfig {
    pub fn with_pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    pub fn with_labels(mut self, labels: Option<Vec<u32>>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_lateral_side(mut self, side: LateralSide) -> Self {
        self.lateral_side = side;
        self
    }

    pub fn with_lateral_pad(mut self, pad: usize) -> Self {
        self.lateral_pad = pad;
        self
    }
}

/// Full linear registration pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub cleaning: CleaningConfig,
    pub roi: RoiConfig,
    pub registration: RegistrationConfig,
    /// Restrict the metric to the cropped fixed mask instead of the whole
    /// fixed ROI.
    pub use_fixed_metric_mask: bool,
    /// Restrict the metric to the cropped moving mask.
    pub use_moving_metric_mask: bool,
    /// Downsample both ROIs by this factor before estimation.
    pub registration_downsample_factor: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            cleaning: CleaningConfig::default(),
            roi: RoiConfig::default(),
            registration: RegistrationConfig::default(),
            use_fixed_metric_mask: false,
            use_moving_metric_mask: false,
            registration_downsample_factor: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segmentation(mut self, segmentation: SegmentationConfig) -> Self {
        self.segmentation = segmentation;
        self
    }

    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_roi(mut self, roi: RoiConfig) -> Self {
        self.roi = roi;
        self
    }

    pub fn with_registration(mut self, registration: RegistrationConfig) -> Self {
        self.registration = registration;
        self
    }

    pub fn with_fixed_metric_mask(mut self, enabled: bool) -> Self {
        self.use_fixed_metric_mask = enabled;
        self
    }

    pub fn with_moving_metric_mask(mut self, enabled: bool) -> Self {
        self.use_moving_metric_mask = enabled;
        self
    }

    pub fn with_registration_downsample_factor(mut self, factor: Option<f64>) -> Self {
        self.registration_downsample_factor = factor;
        self
    }

    /// Check every stage's parameters up front.
    pub fn validate(&self) -> Result<()> {
        HuThresholdSegmenter::new(&self.segmentation)?;
        MaskCleaningFilter::new(&self.cleaning)?;
        if let Some(factor) = self.registration_downsample_factor {
            DownsampleFilter::new(factor)?;
        }
        self.registration.validate()
    }
}
