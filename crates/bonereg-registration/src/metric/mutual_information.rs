//! Mattes mutual information between a fixed and a transformed moving image.

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Shape, Tensor, TensorData};
use bonereg_core::filter::inside_domain;
use bonereg_core::image::grid_from_flat_indices;
use bonereg_core::interpolation::{Interpolator, LinearInterpolator, NearestNeighborInterpolator};
use bonereg_core::transform::{ParametricAffineTransform, Transform};
use bonereg_core::{AffineTransform, Image, ImageError, ImageMetadata, Point};
use crate::config::{RegistrationConfig, SamplingStrategy};
use crate::error::Result;
use super::gradient::ImageGradient;
use super::histogram::{IntensityRange, ParzenJointHistogram};
use super::trait_::{Metric, MetricEvaluation};

/// Samples processed per batch.
const CHUNK_SIZE: usize = 32768;

/// Histogram and sampling settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSettings {
    pub num_bins: usize,
    pub parzen_sigma: f64,
    pub sampling: SamplingStrategy,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self::from(&RegistrationConfig::default())
    }
}

impl From<&RegistrationConfig> for MetricSettings {
    fn from(config: &RegistrationConfig) -> Self {
        Self {
            num_bins: config.number_of_histogram_bins,
            parzen_sigma: config.parzen_sigma,
            sampling: config.sampling,
        }
    }
}

/// Optional masks restricting the metric.
#[derive(Debug)]
pub struct MetricMasks<'a, B: Backend> {
    /// Only fixed voxels where this mask is nonzero are sampled.
    pub fixed: Option<&'a Image<B, 3>>,
    /// Samples mapping where this mask is zero are ignored.
    pub moving: Option<&'a Image<B, 3>>,
}

impl<B: Backend> Default for MetricMasks<'_, B> {
    fn default() -> Self {
        Self { fixed: None, moving: None }
    }
}

struct SampleChunk<B: Backend> {
    /// Physical positions of the fixed samples, `[N, 3]`.
    points: Tensor<B, 2>,
    /// Fixed intensities in bin units, `[N]`.
    fixed_positions: Tensor<B, 1>,
}

/// Mattes mutual information metric.
///
/// The fixed samples, their bin positions and the moving gradient image are
/// prepared once; each evaluation only maps the samples through the current
/// affine parameters. The value is `-MI`, so lower is better.
///
/// The derivative comes from burn autodiff. Moving intensities are sampled
/// with linear interpolation, and their dependence on the mapped point is
/// taken from the central-difference gradient image (straight-through), so
/// it does not depend on which voxel cell a point falls in.
pub struct MattesMutualInformation<B: AutodiffBackend> {
    histogram: ParzenJointHistogram,
    moving_range: IntensityRange,
    moving: Tensor<B, 3>,
    moving_gradient: ImageGradient<B>,
    moving_mask: Option<Tensor<B, 3>>,
    moving_meta: ImageMetadata<3>,
    center: Point<3>,
    chunks: Vec<SampleChunk<B>>,
    num_samples: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> MattesMutualInformation<B> {
    /// Prepare the metric for the given image pair.
    ///
    /// `center` is the fixed rotation centre of the affine transforms that
    /// will be evaluated.
    pub fn new(
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
        masks: MetricMasks<'_, B>,
        center: Point<3>,
        settings: &MetricSettings,
    ) -> Result<Self> {
        let device = fixed.device();
        let histogram = ParzenJointHistogram::new(settings.num_bins, settings.parzen_sigma as f32);

        let fixed_values = fixed.to_vec()?;
        let fixed_mask = match masks.fixed {
            Some(mask) => {
                if !mask.is_same_grid(fixed) {
                    return Err(ImageError::geometry_mismatch("fixed metric mask is not on the fixed image grid").into());
                }
                Some(mask.to_vec()?)
            }
            None => None,
        };
        let selected = select_fixed_samples(fixed.size(), fixed_mask.as_deref(), settings.sampling);
        if selected.is_empty() {
            return Err(ImageError::validation("fixed metric mask selects no voxels").into());
        }
        let sample_values: Vec<f32> = selected.iter().map(|&i| fixed_values[i]).collect();
        let fixed_range = IntensityRange::from_values(&sample_values)
            .ok_or_else(|| ImageError::validation("fixed image has no finite samples"))?;

        let moving_values = moving.to_vec()?;
        let (moving_mask, masked_values) = match masks.moving {
            Some(mask) => {
                if !mask.is_same_grid(moving) {
                    return Err(ImageError::geometry_mismatch("moving metric mask is not on the moving image grid").into());
                }
                let inside: Vec<f32> = moving_values
                    .iter()
                    .zip(mask.to_vec()?)
                    .filter(|(_, m)| *m != 0.0)
                    .map(|(&v, _)| v)
                    .collect();
                (Some(mask.data().clone()), inside)
            }
            None => (None, Vec::new()),
        };
        // an empty moving mask leaves no valid samples; the optimizer reports that
        let range_values = if masked_values.is_empty() { &moving_values } else { &masked_values };
        let moving_range = IntensityRange::from_values(range_values)
            .ok_or_else(|| ImageError::validation("moving image has no finite voxels"))?;

        let fixed_meta = fixed.metadata();
        let mut chunks = Vec::with_capacity(selected.len().div_ceil(CHUNK_SIZE));
        for (indices, values) in selected.chunks(CHUNK_SIZE).zip(sample_values.chunks(CHUNK_SIZE)) {
            let grid = grid_from_flat_indices::<B>(fixed_meta.shape(), indices, &device);
            let values = Tensor::<B, 1>::from_data(
                TensorData::new(values.to_vec(), Shape::new([values.len()])),
                &device,
            );
            chunks.push(SampleChunk {
                points: fixed_meta.index_to_world_tensor(grid),
                fixed_positions: histogram.bin_positions(values, fixed_range),
            });
        }

        tracing::debug!(
            "Mutual information: {} fixed samples, {} bins, fixed range [{}, {}], moving range [{}, {}]",
            selected.len(),
            settings.num_bins,
            fixed_range.min,
            fixed_range.max,
            moving_range.min,
            moving_range.max
        );

        Ok(Self {
            histogram,
            moving_range,
            moving: moving.data().clone(),
            moving_gradient: ImageGradient::compute(moving)?,
            moving_mask,
            moving_meta: moving.metadata(),
            center,
            chunks,
            num_samples: selected.len(),
            device,
        })
    }

    /// Number of fixed samples (before the moving-domain test).
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn center(&self) -> &Point<3> {
        &self.center
    }

    fn parameters_tensor(&self, parameters: &[f64]) -> Tensor<B, 1> {
        let values: Vec<f32> = parameters.iter().map(|&p| p as f32).collect();
        Tensor::from_data(TensorData::new(values, Shape::new([parameters.len()])), &self.device)
    }

    /// Joint histogram contribution of one chunk and its count of valid samples.
    fn chunk_histogram(
        &self,
        chunk: &SampleChunk<B>,
        transform: &ParametricAffineTransform<B, 3>,
    ) -> (Tensor<B, 2>, Tensor<B, 1>) {
        let [n, _] = chunk.points.dims();
        let mapped = transform.transform_points(chunk.points.clone());
        let anchor = mapped.clone().detach();
        let indices = self.moving_meta.world_to_index_tensor(anchor.clone());

        let mut valid = inside_domain(indices.clone(), self.moving_meta.size);
        if let Some(mask) = &self.moving_mask {
            let inside_mask = NearestNeighborInterpolator::new().interpolate(mask, indices.clone());
            valid = valid * inside_mask.abs().greater_elem(0.0).float();
        }

        let linear = LinearInterpolator::new();
        let value = linear.interpolate(&self.moving, indices.clone());
        let gradient = Tensor::stack::<2>(
            self.moving_gradient
                .components
                .iter()
                .map(|component| linear.interpolate(component, indices.clone()))
                .collect(),
            1,
        );
        // zero-valued, carries d(mapped)/d(parameters)
        let delta = mapped - anchor;
        let moving_values = value + (gradient * delta).sum_dim(1).squeeze::<1>(1);

        let moving_weights = self
            .histogram
            .parzen_weights(self.histogram.bin_positions(moving_values, self.moving_range));
        let fixed_weights =
            self.histogram.parzen_weights(chunk.fixed_positions.clone()) * valid.clone().reshape([n, 1]);

        (self.histogram.joint_histogram(fixed_weights, moving_weights), valid)
    }

    /// Full joint histogram with untracked parameters.
    fn joint_histogram(&self, parameters: &[f64]) -> (Tensor<B, 2>, usize) {
        let transform = ParametricAffineTransform::new(self.parameters_tensor(parameters), &self.center);
        let bins = self.histogram.num_bins;
        let mut joint = Tensor::<B, 2>::zeros([bins, bins], &self.device);
        let mut valid = 0.0f64;
        for chunk in &self.chunks {
            let (chunk_joint, chunk_valid) = self.chunk_histogram(chunk, &transform);
            joint = joint + chunk_joint;
            valid += chunk_valid.sum().into_scalar().elem::<f64>();
        }
        (joint, valid.round() as usize)
    }
}

impl<B: AutodiffBackend> Metric for MattesMutualInformation<B> {
    fn num_parameters(&self) -> usize {
        AffineTransform::<3>::num_parameters()
    }

    fn value(&self, parameters: &[f64]) -> Result<MetricEvaluation> {
        let (joint, valid_samples) = self.joint_histogram(parameters);
        if valid_samples == 0 {
            return Ok(MetricEvaluation::empty(parameters.len()));
        }
        let mi = self.histogram.mutual_information(joint).into_scalar().elem::<f64>();
        Ok(MetricEvaluation {
            value: -mi,
            derivative: Vec::new(),
            valid_samples,
        })
    }

    fn value_and_derivative(&self, parameters: &[f64]) -> Result<MetricEvaluation> {
        let (joint, valid_samples) = self.joint_histogram(parameters);
        if valid_samples == 0 {
            return Ok(MetricEvaluation::empty(parameters.len()));
        }

        // d(-MI)/d(joint), then chain through each chunk separately so only
        // one chunk's graph is alive at a time.
        let joint = joint.detach().require_grad();
        let loss = self.histogram.mutual_information(joint.clone()).neg();
        let value = loss.clone().into_scalar().elem::<f64>();
        let grads = loss.backward();
        let Some(joint_grad) = joint.grad(&grads) else {
            return Ok(MetricEvaluation {
                value,
                derivative: vec![0.0; parameters.len()],
                valid_samples,
            });
        };
        let joint_grad = Tensor::<B, 2>::from_inner(joint_grad);

        let mut derivative = vec![0.0f64; parameters.len()];
        for chunk in &self.chunks {
            let tracked = self.parameters_tensor(parameters).require_grad();
            let transform = ParametricAffineTransform::new(tracked.clone(), &self.center);
            let (chunk_joint, _) = self.chunk_histogram(chunk, &transform);
            let surrogate = (chunk_joint * joint_grad.clone()).sum();
            let grads = surrogate.backward();
            if let Some(grad) = tracked.grad(&grads) {
                let grad = grad
                    .into_data()
                    .convert::<f32>()
                    .to_vec::<f32>()
                    .map_err(|e| ImageError::Data(format!("{:?}", e)))?;
                for (d, g) in derivative.iter_mut().zip(grad) {
                    *d += g as f64;
                }
            }
        }

        Ok(MetricEvaluation {
            value,
            derivative,
            valid_samples,
        })
    }

    fn name(&self) -> &'static str {
        "MattesMutualInformation"
    }
}

/// Flat indices of the fixed voxels that feed the metric.
pub fn select_fixed_samples(size: [usize; 3], mask: Option<&[f32]>, sampling: SamplingStrategy) -> Vec<usize> {
    let [nx, ny, nz] = size;
    let step = match sampling {
        SamplingStrategy::Full => 1,
        SamplingStrategy::Regular { step } => step.max(1),
    };
    let mut selected = Vec::new();
    for z in (0..nz).step_by(step) {
        for y in (0..ny).step_by(step) {
            for x in (0..nx).step_by(step) {
                let flat = x + nx * (y + ny * z);
                if mask.map_or(true, |m| m[flat] != 0.0) {
                    selected.push(flat);
                }
            }
        }
    }
    selected
}
