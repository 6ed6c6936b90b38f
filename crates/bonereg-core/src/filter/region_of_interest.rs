//! Cropping to mask-derived and lateral regions of interest.

use std::fmt;
use std::str::FromStr;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use crate::error::{ImageError, Result};
use crate::image::{BoundingBox, Image};
use super::label_statistics::LabelStatistics;

/// Crops an image and its mask to the padded bounding box of mask labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiExtractor {
    pad: usize,
    labels: Option<Vec<u32>>,
}

impl Default for RoiExtractor {
    fn default() -> Self {
        Self { pad: 10, labels: None }
    }
}

impl RoiExtractor {
    pub fn new(pad: usize) -> Self {
        Self { pad, labels: None }
    }

    /// Restrict the multi-label box to these labels. `None` means every
    /// nonzero label present in the mask.
    pub fn with_labels(mut self, labels: Option<Vec<u32>>) -> Self {
        self.labels = labels;
        self
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    /// Padded box around the voxels equal to 1.
    pub fn bounding_box<B: Backend>(&self, mask: &Image<B, 3>) -> Result<BoundingBox<3>> {
        let stats = LabelStatistics::compute(mask)?;
        let tight = stats
            .bounding_box(1)
            .ok_or_else(|| ImageError::validation("mask has no foreground voxels (label 1)"))?;
        Ok(tight.pad_and_clip(self.pad, mask.size()))
    }

    /// Padded box around the union of the requested labels.
    ///
    /// Requested labels missing from the mask are skipped as long as at least
    /// one of them is present.
    pub fn bounding_box_multi<B: Backend>(&self, mask: &Image<B, 3>) -> Result<BoundingBox<3>> {
        let stats = LabelStatistics::compute(mask)?;
        let labels = match &self.labels {
            Some(labels) => labels.clone(),
            None => stats.labels(),
        };
        if labels.is_empty() {
            return Err(ImageError::validation("no labels requested"));
        }

        let tight = labels
            .iter()
            .filter_map(|&label| stats.bounding_box(label))
            .reduce(|acc, b| acc.union(&b))
            .ok_or_else(|| {
                ImageError::validation(format!(
                    "none of the requested labels {:?} are present in the mask",
                    labels
                ))
            })?;
        Ok(tight.pad_and_clip(self.pad, mask.size()))
    }

    /// Crop `image` and `mask` to the box of label 1.
    pub fn crop<B: Backend>(&self, image: &Image<B, 3>, mask: &Image<B, 3>) -> Result<(Image<B, 3>, Image<B, 3>)> {
        check_same_size(image, mask)?;
        let region = self.bounding_box(mask)?;
        crop_pair(image, mask, &region)
    }

    /// Crop `image` and `mask` to the box of the selected labels.
    pub fn crop_multi<B: Backend>(
        &self,
        image: &Image<B, 3>,
        mask: &Image<B, 3>,
    ) -> Result<(Image<B, 3>, Image<B, 3>)> {
        check_same_size(image, mask)?;
        let region = self.bounding_box_multi(mask)?;
        crop_pair(image, mask, &region)
    }
}

fn check_same_size<B: Backend>(image: &Image<B, 3>, mask: &Image<B, 3>) -> Result<()> {
    if image.size() != mask.size() {
        return Err(ImageError::shape_mismatch(&image.size(), &mask.size()));
    }
    Ok(())
}

fn crop_pair<B: Backend>(
    image: &Image<B, 3>,
    mask: &Image<B, 3>,
    region: &BoundingBox<3>,
) -> Result<(Image<B, 3>, Image<B, 3>)> {
    tracing::debug!("ROI start {:?} size {:?}", region.start, region.size);
    Ok((image.region_of_interest(region)?, mask.region_of_interest(region)?))
}

/// Which half of the body to keep, along index axis 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LateralSide {
    /// Low x indices.
    #[default]
    Right,
    /// High x indices.
    Left,
}

impl FromStr for LateralSide {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "right" => Ok(LateralSide::Right),
            "l" | "left" => Ok(LateralSide::Left),
            other => Err(ImageError::validation(format!(
                "unknown lateral side '{}': only 'r' and 'l' are acceptable",
                other
            ))),
        }
    }
}

impl fmt::Display for LateralSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LateralSide::Right => write!(f, "right"),
            LateralSide::Left => write!(f, "left"),
        }
    }
}

/// Keeps one half of a volume along x, overlapping the midline by `pad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateralCropper {
    side: LateralSide,
    pad: usize,
}

impl LateralCropper {
    pub fn new(side: LateralSide, pad: usize) -> Self {
        Self { side, pad }
    }

    /// `right`: start 0; `left`: start `size₀/2 - pad`. Both are
    /// `size₀/2 + pad` wide and span the full y and z extent.
    pub fn bounding_box(&self, size: [usize; 3]) -> Result<BoundingBox<3>> {
        let half = size[0] / 2;
        let width = half + self.pad;
        let start_x = match self.side {
            LateralSide::Right => 0,
            LateralSide::Left => half.checked_sub(self.pad).ok_or_else(|| {
                ImageError::validation(format!(
                    "lateral pad {} exceeds half width {} of the image",
                    self.pad, half
                ))
            })?,
        };
        if start_x + width > size[0] {
            return Err(ImageError::validation(format!(
                "lateral crop of width {} does not fit in {} voxels",
                width, size[0]
            )));
        }
        Ok(BoundingBox::new([start_x, 0, 0], [width, size[1], size[2]]))
    }

    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        let region = self.bounding_box(image.size())?;
        tracing::debug!("Lateral crop ({}) start {:?} size {:?}", self.side, region.start, region.size);
        image.region_of_interest(&region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::{ImageMetadata, PixelType};
    use crate::spatial::{Direction, Point, Spacing};

    type TestBackend = NdArray<f32>;

    fn mask_with(size: [usize; 3], voxels: &[([usize; 3], f32)]) -> Image<TestBackend, 3> {
        let meta = ImageMetadata::new(size, Point::origin(), Spacing::uniform(1.0), Direction::identity());
        let mut values = vec![0.0f32; meta.num_voxels()];
        for &([x, y, z], v) in voxels {
            values[x + size[0] * (y + size[1] * z)] = v;
        }
        Image::from_voxels(values, &meta, PixelType::UInt8, &Default::default()).unwrap()
    }

    #[test]
    fn test_full_mask_gives_full_image() {
        let size = [6, 5, 4];
        let meta = ImageMetadata::new(size, Point::origin(), Spacing::uniform(1.0), Direction::identity());
        let mask = Image::<TestBackend, 3>::from_voxels(vec![1.0; 120], &meta, PixelType::UInt8, &Default::default())
            .unwrap();
        let image = mask.clone().with_pixel_type(PixelType::Int16);
        let (roi, roi_mask) = RoiExtractor::new(10).crop(&image, &mask).unwrap();
        assert_eq!(roi.size(), size);
        assert_eq!(roi_mask.size(), size);
        assert_eq!(roi.origin(), image.origin());
        assert_eq!(roi.pixel_type(), PixelType::Int16);
    }

    #[test]
    fn test_empty_mask_is_validation_error() {
        let mask = mask_with([4, 4, 4], &[]);
        let result = RoiExtractor::new(1).bounding_box(&mask);
        assert!(matches!(result, Err(ImageError::Validation(_))));
    }

    #[test]
    fn test_multi_label_union() {
        let mask = mask_with([20, 20, 20], &[([5, 5, 5], 1.0), ([12, 8, 6], 3.0), ([2, 15, 9], 7.0)]);
        let extractor = RoiExtractor::new(1).with_labels(Some(vec![1, 3, 42]));
        let region = extractor.bounding_box_multi(&mask).unwrap();
        assert_eq!(region.start, [4, 4, 4]);
        assert_eq!(region.size, [10, 6, 4]);

        let all = RoiExtractor::new(0).bounding_box_multi(&mask).unwrap();
        assert_eq!(all.start, [2, 5, 5]);
        assert_eq!(all.end(), [13, 16, 10]);
    }

    #[test]
    fn test_multi_label_errors() {
        let mask = mask_with([8, 8, 8], &[([1, 1, 1], 2.0)]);
        let none_requested = RoiExtractor::new(1).with_labels(Some(vec![]));
        let err = none_requested.bounding_box_multi(&mask).unwrap_err();
        assert!(err.to_string().contains("no labels requested"));

        let absent = RoiExtractor::new(1).with_labels(Some(vec![5, 6]));
        let err = absent.bounding_box_multi(&mask).unwrap_err();
        assert!(err.to_string().contains("none of the requested labels"));

        let empty = mask_with([8, 8, 8], &[]);
        assert!(RoiExtractor::new(1).bounding_box_multi(&empty).is_err());
    }

    #[test]
    fn test_crop_rejects_size_mismatch() {
        let mask = mask_with([8, 8, 8], &[([1, 1, 1], 1.0)]);
        let image = mask_with([8, 8, 9], &[]);
        assert!(matches!(
            RoiExtractor::new(1).crop(&image, &mask),
            Err(ImageError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_lateral_boxes() {
        let size = [50, 30, 20];
        let right = LateralCropper::new(LateralSide::Right, 10).bounding_box(size).unwrap();
        assert_eq!(right, BoundingBox::new([0, 0, 0], [35, 30, 20]));
        let left = LateralCropper::new(LateralSide::Left, 10).bounding_box(size).unwrap();
        assert_eq!(left, BoundingBox::new([15, 0, 0], [35, 30, 20]));
        assert!(LateralCropper::new(LateralSide::Left, 30).bounding_box(size).is_err());
        assert!(LateralCropper::new(LateralSide::Right, 26).bounding_box(size).is_err());
    }

    #[test]
    fn test_lateral_side_parsing() {
        assert_eq!("r".parse::<LateralSide>().unwrap(), LateralSide::Right);
        assert_eq!("Left".parse::<LateralSide>().unwrap(), LateralSide::Left);
        assert!(matches!("x".parse::<LateralSide>(), Err(ImageError::Validation(_))));
    }

    #[test]
    fn test_lateral_crop_moves_origin() {
        let image = mask_with([10, 2, 2], &[([7, 0, 0], 5.0)]);
        let cropped = LateralCropper::new(LateralSide::Left, 1).apply(&image).unwrap();
        assert_eq!(cropped.size(), [6, 2, 2]);
        assert_eq!(cropped.origin(), &Point::new([4.0, 0.0, 0.0]));
        assert_eq!(cropped.to_vec().unwrap()[3], 5.0);
    }
}
