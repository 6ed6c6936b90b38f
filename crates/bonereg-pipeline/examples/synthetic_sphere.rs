//! Registers two synthetic CT volumes containing a translated bone sphere.
//!
//! Run with `RUST_LOG=info cargo run -p bonereg-pipeline --example synthetic_sphere`.

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use bonereg_core::filter::{dice_coefficient, CleaningConfig};
use bonereg_core::{Direction, Image, ImageMetadata, PixelType, Point, Spacing};
use bonereg_pipeline::{LinearRegistrationPipeline, PipelineConfig};
use bonereg_registration::RegistrationConfig;
use tracing_subscriber::EnvFilter;

type Backend = Autodiff<NdArray<f32>>;

fn phantom(center: [f64; 3]) -> anyhow::Result<Image<Backend, 3>> {
    let size = [80, 48, 48];
    let meta = ImageMetadata::new(size, Point::origin(), Spacing::new([0.8, 0.8, 1.2]), Direction::identity());
    let mut values = Vec::with_capacity(meta.num_voxels());
    for z in 0..size[2] {
        for y in 0..size[1] {
            for x in 0..size[0] {
                let p = meta.index_to_physical(&Point::new([x as f64, y as f64, z as f64]));
                let d = p.distance(&Point::new(center));
                // soft tissue background around a dense sphere
                let bone = 400.0 * (8.5 - d).clamp(0.0, 1.0);
                values.push((40.0 + bone) as f32);
            }
        }
    }
    Ok(Image::from_voxels(values, &meta, PixelType::Int16, &Default::default())?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fixed = phantom([28.0, 19.0, 28.0])?;
    let moving = phantom([34.0, 17.5, 29.0])?;

    let config = PipelineConfig::default()
        .with_cleaning(CleaningConfig::default().with_size_threshold(1_000.0))
        .with_registration(RegistrationConfig::default().with_number_of_iterations(150).with_log_interval(10));
    let output = LinearRegistrationPipeline::<Backend>::new(config)?.register(&fixed, &moving, None, None)?;

    println!("stop condition: {}", output.diagnostics);
    println!("translation:    {:?}", output.affine_transform.translation().to_vec());
    if let Some(fixed_mask) = &output.fixed_mask {
        println!("mask dice:      {:.4}", dice_coefficient(&output.registered_mask, fixed_mask)?);
    }
    Ok(())
}
