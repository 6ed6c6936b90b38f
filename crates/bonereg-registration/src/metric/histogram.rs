//! Histogram computation utilities for the mutual information metric.
//!
//! Differentiable soft histogramming with a Gaussian Parzen window. Every
//! sample spreads a unit mass over the bins, so the joint histogram is a
//! plain (weighted) sample count that can be accumulated chunk by chunk.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Intensity interval mapped onto the bin axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityRange {
    pub min: f32,
    pub max: f32,
}

impl IntensityRange {
    /// Range of `values`. A constant input gets a unit-wide range so that
    /// every sample falls into the first bin.
    pub fn from_values(values: &[f32]) -> Option<Self> {
        let mut iter = values.iter().copied().filter(|v| v.is_finite());
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self::new(min, max))
    }

    pub fn new(min: f32, max: f32) -> Self {
        if max > min {
            Self { min, max }
        } else {
            Self { min, max: min + 1.0 }
        }
    }

    pub fn width(&self) -> f32 {
        self.max - self.min
    }
}

/// Joint histogram calculator using Parzen windowing.
#[derive(Debug, Clone, Copy)]
pub struct ParzenJointHistogram {
    /// Number of histogram bins per axis.
    pub num_bins: usize,
    /// Parzen window sigma, in bins.
    pub parzen_sigma: f32,
}

impl ParzenJointHistogram {
    pub fn new(num_bins: usize, parzen_sigma: f32) -> Self {
        Self { num_bins, parzen_sigma }
    }

    /// Continuous bin coordinate of each value, `range.min -> 0` and
    /// `range.max -> num_bins - 1`.
    pub fn bin_positions<B: Backend>(&self, values: Tensor<B, 1>, range: IntensityRange) -> Tensor<B, 1> {
        let scale = (self.num_bins as f32 - 1.0) / range.width();
        (values - range.min) * scale
    }

    /// Parzen weights `[N, Bins]`, each row summing to one.
    ///
    /// `W[i, b] = exp(-0.5 * ((pos[i] - b) / sigma)^2)` before normalisation.
    pub fn parzen_weights<B: Backend>(&self, positions: Tensor<B, 1>) -> Tensor<B, 2> {
        let device = positions.device();
        let [n] = positions.dims();
        let bins = Tensor::<B, 1, Int>::arange(0..self.num_bins as i64, &device)
            .float()
            .reshape([1, self.num_bins]);
        let sigma_sq = self.parzen_sigma * self.parzen_sigma;

        let diff = positions.reshape([n, 1]) - bins;
        let weights = (diff.powf_scalar(2.0) * (-0.5 / sigma_sq)).exp();
        let total = weights.clone().sum_dim(1);
        weights / total
    }

    /// Joint histogram `[Bins, Bins]` of pre-computed weights; rows index the
    /// fixed intensity, columns the moving intensity.
    pub fn joint_histogram<B: Backend>(&self, fixed_weights: Tensor<B, 2>, moving_weights: Tensor<B, 2>) -> Tensor<B, 2> {
        fixed_weights.transpose().matmul(moving_weights)
    }

    /// Compute entropy of a distribution P.
    pub fn compute_entropy<B: Backend>(p: Tensor<B, 1>) -> Tensor<B, 1> {
        let eps = 1e-10;
        let log_p = (p.clone() + eps).log();
        p.mul(log_p).sum().neg()
    }

    /// `H(fixed) + H(moving) - H(fixed, moving)` of an unnormalised joint
    /// histogram.
    pub fn mutual_information<B: Backend>(&self, joint: Tensor<B, 2>) -> Tensor<B, 1> {
        let bins = self.num_bins;
        let p = joint.clone() / joint.sum().reshape([1, 1]);
        let p_fixed = p.clone().sum_dim(1).reshape([bins]);
        let p_moving = p.clone().sum_dim(0).reshape([bins]);
        let p_joint = p.reshape([bins * bins]);

        Self::compute_entropy(p_fixed) + Self::compute_entropy(p_moving) - Self::compute_entropy(p_joint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::ElementConversion;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_range_guards_constant_input() {
        let range = IntensityRange::from_values(&[3.0, 3.0]).unwrap();
        assert_eq!(range, IntensityRange { min: 3.0, max: 4.0 });
        assert!(IntensityRange::from_values(&[]).is_none());
        let range = IntensityRange::from_values(&[2.0, -1.0, f32::NAN, 5.0]).unwrap();
        assert_eq!(range, IntensityRange { min: -1.0, max: 5.0 });
    }

    #[test]
    fn test_bin_positions_span_the_bins() {
        let device = Default::default();
        let histogram = ParzenJointHistogram::new(11, 1.0);
        let values = Tensor::<TestBackend, 1>::from_floats([0.0, 50.0, 100.0], &device);
        let positions: Vec<f32> = histogram
            .bin_positions(values, IntensityRange::new(0.0, 100.0))
            .into_data()
            .to_vec()
            .unwrap();
        for (p, e) in positions.iter().zip([0.0, 5.0, 10.0]) {
            assert!((p - e).abs() < 1e-5);
        }
    }

    #[test]
    fn test_weights_are_normalised() {
        let device = Default::default();
        let histogram = ParzenJointHistogram::new(8, 1.0);
        let positions = Tensor::<TestBackend, 1>::from_floats([0.0, 3.3, 7.0], &device);
        let sums: Vec<f32> = histogram.parzen_weights(positions).sum_dim(1).into_data().to_vec().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mutual_information_of_identical_and_independent() {
        let device = Default::default();
        let histogram = ParzenJointHistogram::new(2, 1.0);

        // perfectly dependent: MI = ln 2
        let diagonal = Tensor::<TestBackend, 2>::from_floats([[5.0, 0.0], [0.0, 5.0]], &device);
        let mi = histogram.mutual_information(diagonal).into_scalar().elem::<f64>();
        assert!((mi - std::f64::consts::LN_2).abs() < 1e-4);

        // independent: MI = 0
        let uniform = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0], [1.0, 1.0]], &device);
        let mi = histogram.mutual_information(uniform).into_scalar().elem::<f64>();
        assert!(mi.abs() < 1e-5);
    }

    #[test]
    fn test_joint_histogram_counts_samples() {
        let device = Default::default();
        let histogram = ParzenJointHistogram::new(4, 0.5);
        let fixed = histogram.parzen_weights(Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 3.0], &device));
        let moving = histogram.parzen_weights(Tensor::<TestBackend, 1>::from_floats([0.0, 2.0, 3.0], &device));
        let total = histogram.joint_histogram(fixed, moving).sum().into_scalar().elem::<f64>();
        assert!((total - 3.0).abs() < 1e-4);
    }
}
