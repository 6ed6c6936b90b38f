//! Removal of small disconnected structures from a binary mask.

use std::collections::BTreeSet;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use crate::error::{ImageError, Result};
use crate::image::Image;
use super::connected_component::ConnectedComponentFilter;
use super::label_statistics::LabelStatistics;
use super::morphology::mask_from_binary;

/// Mask cleaning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Components must be strictly larger than this physical volume (mm³).
    pub size_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            size_threshold: 100_000.0,
        }
    }
}

impl CleaningConfig {
    pub fn with_size_threshold(mut self, size_threshold: f64) -> Self {
        self.size_threshold = size_threshold;
        self
    }
}

/// Keeps the 6-connected components whose physical size exceeds a threshold.
///
/// Targets high-density objects that are not part of the skeleton, such as
/// the scanner table. The result is all zero when nothing qualifies.
#[derive(Debug, Clone)]
pub struct MaskCleaningFilter {
    size_threshold: f64,
}

impl MaskCleaningFilter {
    pub fn new(config: &CleaningConfig) -> Result<Self> {
        if !config.size_threshold.is_finite() || config.size_threshold < 0.0 {
            return Err(ImageError::validation(format!(
                "size threshold must be a non-negative finite volume, got {}",
                config.size_threshold
            )));
        }
        Ok(Self {
            size_threshold: config.size_threshold,
        })
    }

    pub fn apply<B: Backend>(&self, mask: &Image<B, 3>) -> Result<Image<B, 3>> {
        let metadata = mask.metadata();
        let components = ConnectedComponentFilter::new().apply(mask)?;
        let labels = components.to_vec()?;
        let stats = LabelStatistics::from_voxels(&labels, &metadata);
        let count = stats.len();
        let kept: BTreeSet<u32> = stats
            .iter()
            .filter(|shape| shape.physical_size > self.size_threshold)
            .map(|shape| shape.label)
            .collect();

        tracing::debug!(
            "Mask cleaning: kept {} of {} components (threshold {} mm³)",
            kept.len(),
            count,
            self.size_threshold
        );
        if kept.is_empty() && count > 0 {
            tracing::warn!("Mask cleaning removed every component; result is empty");
        }

        let cleaned = labels
            .iter()
            .map(|&l| u8::from(kept.contains(&(l.round() as u32))))
            .collect();
        mask_from_binary(cleaned, &metadata, &mask.device())
    }
}
