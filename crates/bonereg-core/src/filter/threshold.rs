//! Binary threshold filter.

use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::{Image, PixelType};

/// Marks voxels with `lower <= v` and, when an upper bound is set, `v < upper`.
///
/// Output is a UInt8 mask with 1 inside and 0 outside on the input grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryThresholdFilter {
    lower: f64,
    upper: Option<f64>,
}

impl BinaryThresholdFilter {
    pub fn new(lower: f64, upper: Option<f64>) -> Result<Self> {
        if !lower.is_finite() || upper.map_or(false, |u| !u.is_finite()) {
            return Err(ImageError::validation("threshold bounds must be finite"));
        }
        if let Some(upper) = upper {
            if upper <= lower {
                return Err(ImageError::validation(format!(
                    "upper threshold {} must be greater than lower threshold {}",
                    upper, lower
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    pub fn apply<B: Backend, const D: usize>(&self, image: &Image<B, D>) -> Image<B, D> {
        let data = image.data().clone();
        let mut mask = data.clone().greater_equal_elem(self.lower).float();
        if let Some(upper) = self.upper {
            mask = mask * data.lower_elem(upper).float();
        }
        image.with_data(mask).with_pixel_type(PixelType::UInt8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::ImageMetadata;
    use crate::spatial::{Direction, Point, Spacing};

    type TestBackend = NdArray<f32>;

    fn line(values: Vec<f32>) -> Image<TestBackend, 3> {
        let meta = ImageMetadata::new([values.len(), 1, 1], Point::origin(), Spacing::uniform(1.0), Direction::identity());
        Image::from_voxels(values, &meta, PixelType::Int16, &Default::default()).unwrap()
    }

    #[test]
    fn test_lower_inclusive_upper_exclusive() {
        let image = line(vec![100.0, 185.0, 300.0, 499.0, 500.0, 1200.0]);
        let mask = BinaryThresholdFilter::new(185.0, Some(500.0)).unwrap().apply(&image);
        assert_eq!(mask.pixel_type(), PixelType::UInt8);
        assert_eq!(mask.to_vec().unwrap(), vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_without_upper_bound() {
        let image = line(vec![100.0, 185.0, 500.0, 3000.0]);
        let mask = BinaryThresholdFilter::new(185.0, None).unwrap().apply(&image);
        assert_eq!(mask.to_vec().unwrap(), vec![0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(BinaryThresholdFilter::new(500.0, Some(185.0)).is_err());
        assert!(BinaryThresholdFilter::new(f64::NAN, None).is_err());
    }
}
