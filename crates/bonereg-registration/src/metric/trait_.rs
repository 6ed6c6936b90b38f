//! Metric trait for image similarity measurement.

use crate::error::Result;

/// One metric evaluation at a parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvaluation {
    /// Metric value; lower means better alignment.
    pub value: f64,
    /// Derivative with respect to each parameter. Empty when only the value
    /// was requested.
    pub derivative: Vec<f64>,
    /// Fixed samples that mapped inside the moving image (and moving mask).
    pub valid_samples: usize,
}

impl MetricEvaluation {
    /// Evaluation with no contributing samples.
    pub fn empty(num_parameters: usize) -> Self {
        Self {
            value: 0.0,
            derivative: vec![0.0; num_parameters],
            valid_samples: 0,
        }
    }
}

/// Similarity metric over a flat transform parameter vector.
///
/// Implementations own the prepared fixed/moving data; the optimiser only
/// ever sees parameters, values and derivatives.
pub trait Metric {
    /// Length of the parameter vector the metric expects.
    fn num_parameters(&self) -> usize;

    /// Metric value only.
    fn value(&self, parameters: &[f64]) -> Result<MetricEvaluation>;

    /// Metric value and derivative.
    fn value_and_derivative(&self, parameters: &[f64]) -> Result<MetricEvaluation>;

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}
