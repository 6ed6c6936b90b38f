use std::sync::Arc;
use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use bonereg_core::{Direction, Image, ImageMetadata, PixelType, Point, Spacing};
use bonereg_registration::{
    AffineRegistration, CancellationToken, HistoryCallback, LearningRateEstimation, RegistrationConfig,
    RegistrationError, SamplingStrategy, StopCondition,
};

type B = Autodiff<NdArray<f32>>;

const D: usize = 20;

/// Analytic ellipsoid blob centred at `c` (in index units) with radii `r`.
fn ellipsoid(c: [f64; 3], r: [f64; 3], spacing: f64, pixel_type: PixelType) -> Image<B, 3> {
    let meta = ImageMetadata::new([D; 3], Point::origin(), Spacing::uniform(spacing), Direction::identity());
    let mut data = Vec::with_capacity(D * D * D);
    for z in 0..D {
        for y in 0..D {
            for x in 0..D {
                let dx = x as f64 - c[0];
                let dy = y as f64 - c[1];
                let dz = z as f64 - c[2];
                let val = (-(dx * dx) / (2.0 * r[0] * r[0])
                    - (dy * dy) / (2.0 * r[1] * r[1])
                    - (dz * dz) / (2.0 * r[2] * r[2]))
                    .exp();
                data.push((val * 1000.0) as f32);
            }
        }
    }
    Image::from_voxels(data, &meta, pixel_type, &Default::default()).unwrap()
}

/// Soft-edged ball (300) and box (600) placed off-centre.
///
/// A single Gaussian blob keeps an exact intensity mapping under isotropic
/// scaling about its own centre, which leaves the metric flat along scale.
fn two_objects() -> Image<B, 3> {
    let meta = ImageMetadata::new([D; 3], Point::origin(), Spacing::uniform(1.0), Direction::identity());
    let ramp = |v: f64| v.clamp(0.0, 1.0);
    let mut data = Vec::with_capacity(D * D * D);
    for z in 0..D {
        for y in 0..D {
            for x in 0..D {
                let (x, y, z) = (x as f64, y as f64, z as f64);
                let d = ((x - 6.5).powi(2) + (y - 8.0).powi(2) + (z - 9.5).powi(2)).sqrt();
                let face = (x - 11.0).min(17.0 - x).min(y - 5.0).min(14.0 - y).min(z - 6.0).min(15.0 - z);
                data.push((300.0 * ramp(4.5 - d)).max(600.0 * ramp(face + 0.5)) as f32);
            }
        }
    }
    Image::from_voxels(data, &meta, PixelType::Float32, &Default::default()).unwrap()
}

fn max_linear_error(matrix: &nalgebra::Matrix3<f64>) -> f64 {
    (matrix - nalgebra::Matrix3::identity()).abs().max()
}

#[test]
fn test_registering_image_to_itself_stays_at_identity() {
    let image = two_objects();
    let history = Arc::new(HistoryCallback::new());
    let mut registration = AffineRegistration::<B>::new(RegistrationConfig::default().with_number_of_iterations(50))
        .unwrap()
        .with_callback(history.clone());

    let result = registration.execute(&image, &image, None, None).unwrap();

    let translation = result.transform.translation();
    assert!(translation.norm() < 0.1, "translation {:?}", translation.to_vec());
    assert!(
        max_linear_error(result.transform.matrix()) < 0.02,
        "matrix {:?}",
        result.transform.matrix()
    );
    assert!(result.diagnostics.final_metric_value < 0.0);
    assert!(!history.metric_values().is_empty());
}

#[test]
fn test_recovers_translation() {
    let fixed = ellipsoid([9.5, 9.5, 9.5], [2.5, 3.0, 3.5], 1.0, PixelType::Float32);
    let moving = ellipsoid([10.5, 8.5, 10.0], [2.5, 3.0, 3.5], 1.0, PixelType::Float32);

    let config = RegistrationConfig::default()
        .with_number_of_iterations(300)
        .with_learning_rate_estimation(LearningRateEstimation::Once)
        .with_maximum_step_size(0.5);
    let result = AffineRegistration::<B>::new(config)
        .unwrap()
        .execute(&fixed, &moving, None, None)
        .unwrap();

    // fixed -> moving: the fixed blob centre maps onto the moving blob centre
    let mapped = result.transform.transform_point(&Point::new([9.5, 9.5, 9.5]));
    let expected = Point::new([10.5, 8.5, 10.0]);
    assert!(mapped.distance(&expected) < 0.25, "mapped {:?}", mapped.to_vec());
    assert!(result.diagnostics.iterations > 0);
}

#[test]
fn test_regular_sampling_with_integer_pixels() {
    let fixed = ellipsoid([9.5, 9.5, 9.5], [3.0, 3.0, 3.0], 2.0, PixelType::Int16);
    let moving = ellipsoid([9.5, 9.5, 9.5], [3.0, 3.0, 3.0], 2.0, PixelType::Int16);
    let config = RegistrationConfig::default()
        .with_sampling(SamplingStrategy::Regular { step: 2 })
        .with_number_of_iterations(20);
    let result = AffineRegistration::<B>::new(config)
        .unwrap()
        .execute(&fixed, &moving, None, None)
        .unwrap();
    assert!(result.transform.translation().norm() < 0.2);
}

#[test]
fn test_fixed_mask_restricts_samples() {
    let image = ellipsoid([9.5, 9.5, 9.5], [3.0, 4.0, 5.0], 1.0, PixelType::Float32);
    let values: Vec<f32> = image
        .to_vec()
        .unwrap()
        .into_iter()
        .map(|v| if v > 50.0 { 1.0 } else { 0.0 })
        .collect();
    let mask = Image::from_voxels(values, &image.metadata(), PixelType::UInt8, &Default::default()).unwrap();

    let result = AffineRegistration::<B>::new(RegistrationConfig::default().with_number_of_iterations(10))
        .unwrap()
        .execute(&image, &image, Some(&mask), Some(&mask))
        .unwrap();
    assert!(result.transform.translation().norm() < 0.1);
}

#[test]
fn test_cancelled_before_start() {
    let image = ellipsoid([9.5, 9.5, 9.5], [3.0, 4.0, 5.0], 1.0, PixelType::Float32);
    let token = CancellationToken::new();
    token.cancel();
    let result = AffineRegistration::<B>::new(RegistrationConfig::default())
        .unwrap()
        .with_cancellation(token)
        .execute(&image, &image, None, None)
        .unwrap();
    assert_eq!(result.diagnostics.stop_condition, StopCondition::Cancelled);
    assert_eq!(result.diagnostics.iterations, 0);
}

#[test]
fn test_no_contributing_samples_is_numerical_failure() {
    let fixed = ellipsoid([9.5, 9.5, 9.5], [3.0, 4.0, 5.0], 1.0, PixelType::Float32);
    let meta = ImageMetadata::new([D; 3], Point::new([500.0, 0.0, 0.0]), Spacing::uniform(1.0), Direction::identity());
    let moving = Image::from_voxels(fixed.to_vec().unwrap(), &meta, PixelType::Float32, &Default::default()).unwrap();

    // geometry initialisation bridges the offset
    let ok = AffineRegistration::<B>::new(RegistrationConfig::default().with_number_of_iterations(5))
        .unwrap()
        .execute(&fixed, &moving, None, None);
    assert!(ok.is_ok());

    let empty = Image::from_voxels(vec![0.0; D * D * D], &meta, PixelType::UInt8, &Default::default()).unwrap();
    let err = AffineRegistration::<B>::new(RegistrationConfig::default().with_number_of_iterations(5))
        .unwrap()
        .execute(&fixed, &moving, None, Some(&empty))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::NumericalFailure { .. }));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let config = RegistrationConfig::default().with_number_of_histogram_bins(0);
    assert!(matches!(
        AffineRegistration::<B>::new(config),
        Err(RegistrationError::InvalidConfiguration(_))
    ));
}
