//! Bone segmentation by Hounsfield-unit thresholding.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::image::Image;
use super::morphology::{BinaryFillholeFilter, BinaryMorphologicalClosingFilter, StructuringElement};
use super::threshold::BinaryThresholdFilter;

/// Threshold segmentation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Inclusive lower bound in HU.
    pub hu_min: f64,
    /// Exclusive upper bound in HU, if any.
    pub hu_max: Option<f64>,
    /// Radius in voxels of the cubic closing element.
    pub closing_radius: i32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            hu_min: 185.0,
            hu_max: Some(500.0),
            closing_radius: 10,
        }
    }
}

impl SegmentationConfig {
    pub fn with_hu_min(mut self, hu_min: f64) -> Self {
        self.hu_min = hu_min;
        self
    }

    pub fn with_hu_max(mut self, hu_max: Option<f64>) -> Self {
        self.hu_max = hu_max;
        self
    }

    pub fn with_closing_radius(mut self, closing_radius: i32) -> Self {
        self.closing_radius = closing_radius;
        self
    }
}

/// Threshold, close and hole-fill a CT volume into a binary bone mask.
#[derive(Debug, Clone)]
pub struct HuThresholdSegmenter {
    threshold: BinaryThresholdFilter,
    closing: BinaryMorphologicalClosingFilter,
    fill: BinaryFillholeFilter,
}

impl HuThresholdSegmenter {
    pub fn new(config: &SegmentationConfig) -> Result<Self> {
        Ok(Self {
            threshold: BinaryThresholdFilter::new(config.hu_min, config.hu_max)?,
            closing: BinaryMorphologicalClosingFilter::new(StructuringElement::cube(config.closing_radius)?),
            fill: BinaryFillholeFilter::new(),
        })
    }

    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        tracing::debug!(
            "Segmenting with HU in [{}, {:?})",
            self.threshold.lower(),
            self.threshold.upper()
        );
        let mask = self.threshold.apply(image);
        let mask = self.closing.apply(&mask)?;
        self.fill.apply(&mask)
    }
}
