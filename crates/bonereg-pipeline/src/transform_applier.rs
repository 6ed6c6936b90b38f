//! Resampling of full-resolution volumes through an estimated transform.

use burn::tensor::backend::Backend;
use bonereg_core::filter::ResampleImageFilter;
use bonereg_core::interpolation::{LinearInterpolator, NearestNeighborInterpolator};
use bonereg_core::{AffineTransform, Image, Result};

/// Resample `source` onto the grid of `reference` through `transform`.
///
/// `transform` maps reference (fixed) physical points into source (moving)
/// physical space. Labels use nearest neighbour so no blended values
/// appear; intensities use linear interpolation. Points outside the source
/// domain become 0. The output keeps the source pixel type.
pub fn apply_linear_transform<B: Backend>(
    source: &Image<B, 3>,
    transform: &AffineTransform<3>,
    reference: &Image<B, 3>,
    is_label: bool,
) -> Result<Image<B, 3>> {
    tracing::debug!(
        "Resampling {} {:?} onto {:?}",
        if is_label { "labels" } else { "intensities" },
        source.size(),
        reference.size()
    );
    if is_label {
        ResampleImageFilter::new_from_reference(reference, *transform, NearestNeighborInterpolator::new())
            .with_default_pixel_value(0.0)
            .apply(source)
    } else {
        ResampleImageFilter::new_from_reference(reference, *transform, LinearInterpolator::new())
            .with_default_pixel_value(0.0)
            .apply(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use burn_ndarray::NdArray;
    use bonereg_core::{Direction, ImageMetadata, PixelType, Point, Spacing, Vector};

    type TestBackend = NdArray<f32>;

    fn labels() -> Image<TestBackend, 3> {
        let meta = ImageMetadata::new([6, 5, 4], Point::new([2.0, -1.0, 0.5]), Spacing::new([1.0, 0.8, 2.0]), Direction::identity());
        let values = (0..meta.num_voxels()).map(|i| [0.0, 1.0, 4.0, 7.0][i % 4]).collect();
        Image::from_voxels(values, &meta, PixelType::UInt8, &Default::default()).unwrap()
    }

    #[test]
    fn test_identity_keeps_label_set() {
        let source = labels();
        let identity = AffineTransform::identity(source.physical_center());
        let out = apply_linear_transform(&source, &identity, &source, true).unwrap();

        assert_eq!(out.metadata(), source.metadata());
        assert_eq!(out.pixel_type(), PixelType::UInt8);
        assert_eq!(out.to_vec().unwrap(), source.to_vec().unwrap());
    }

    #[test]
    fn test_half_voxel_shift_does_not_blend_labels() {
        let source = labels();
        let shift = AffineTransform::from_translation(Vector::new([0.5, 0.4, 0.0]));
        let out = apply_linear_transform(&source, &shift, &source, true).unwrap();

        let allowed: BTreeSet<u32> = [0, 1, 4, 7].into_iter().collect();
        for v in out.to_vec().unwrap() {
            assert!(allowed.contains(&(v as u32)) && v.fract() == 0.0, "unexpected label {}", v);
        }
    }

    #[test]
    fn test_translation_pulls_from_moving_space() {
        let meta = ImageMetadata::new([8, 1, 1], Point::origin(), Spacing::uniform(1.0), Direction::identity());
        let values: Vec<f32> = (0..8).map(|v| v as f32 * 10.0).collect();
        let source = Image::<TestBackend, 3>::from_voxels(values, &meta, PixelType::Float32, &Default::default()).unwrap();

        // output x samples the source at x + 2
        let transform = AffineTransform::from_translation(Vector::new([2.0, 0.0, 0.0]));
        let out = apply_linear_transform(&source, &transform, &source, false).unwrap();
        assert_eq!(out.to_vec().unwrap(), vec![20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 0.0, 0.0]);
    }
}
