//! Configuration for affine registration.

use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::validation;

/// How the initial transform is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitializationStrategy {
    /// Align the physical centers of both image domains.
    #[default]
    Geometry,
    /// Align the intensity centroids of both images.
    Moments,
}

/// Which fixed voxels feed the metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// Every fixed voxel (inside the fixed mask, when given).
    #[default]
    Full,
    /// Every `step`-th voxel along each axis.
    Regular { step: usize },
}

/// When the learning rate is derived from the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningRateEstimation {
    /// Use the configured learning rate throughout.
    #[default]
    Never,
    /// Estimate once from the first gradient.
    Once,
    /// Re-estimate at every iteration.
    EachIteration,
}

/// Affine registration configuration.
///
/// Defaults reproduce the classic Mattes mutual information plus
/// regular-step gradient descent setup: 50 bins, learning rate 1, 500
/// iterations, convergence below 1e-6 over a window of 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub initialization: InitializationStrategy,
    pub number_of_histogram_bins: usize,
    /// Parzen kernel width in bins.
    pub parzen_sigma: f64,
    pub sampling: SamplingStrategy,
    pub learning_rate: f64,
    pub number_of_iterations: usize,
    pub convergence_minimum_value: f64,
    pub convergence_window_size: usize,
    pub learning_rate_estimation: LearningRateEstimation,
    /// Largest physical shift (mm) a single step may produce.
    pub maximum_step_size: Option<f64>,
    /// Progress is logged every this many iterations.
    pub log_interval: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            initialization: InitializationStrategy::Geometry,
            number_of_histogram_bins: 50,
            parzen_sigma: 1.0,
            sampling: SamplingStrategy::Full,
            learning_rate: 1.0,
            number_of_iterations: 500,
            convergence_minimum_value: 1e-6,
            convergence_window_size: 10,
            learning_rate_estimation: LearningRateEstimation::Never,
            maximum_step_size: None,
            log_interval: 50,
        }
    }
}

impl RegistrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initialization(mut self, initialization: InitializationStrategy) -> Self {
        self.initialization = initialization;
        self
    }

    pub fn with_number_of_histogram_bins(mut self, bins: usize) -> Self {
        self.number_of_histogram_bins = bins;
        self
    }

    pub fn with_parzen_sigma(mut self, sigma: f64) -> Self {
        self.parzen_sigma = sigma;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingStrategy) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_number_of_iterations(mut self, iterations: usize) -> Self {
        self.number_of_iterations = iterations;
        self
    }

    pub fn with_convergence_minimum_value(mut self, value: f64) -> Self {
        self.convergence_minimum_value = value;
        self
    }

    pub fn with_convergence_window_size(mut self, window: usize) -> Self {
        self.convergence_window_size = window;
        self
    }

    pub fn with_learning_rate_estimation(mut self, estimation: LearningRateEstimation) -> Self {
        self.learning_rate_estimation = estimation;
        self
    }

    pub fn with_maximum_step_size(mut self, step: f64) -> Self {
        self.maximum_step_size = Some(step);
        self
    }

    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval;
        self
    }

    /// Check every field; the estimator calls this before doing any work.
    pub fn validate(&self) -> Result<()> {
        validation::validate_histogram_params(self.number_of_histogram_bins, self.parzen_sigma)?;
        validation::validate_learning_rate(self.learning_rate)?;
        validation::validate_iterations(self.number_of_iterations)?;
        validation::validate_convergence(self.convergence_minimum_value, self.convergence_window_size)?;
        if let SamplingStrategy::Regular { step } = self.sampling {
            validation::validate_sampling_step(step)?;
        }
        match (self.learning_rate_estimation, self.maximum_step_size) {
            (LearningRateEstimation::Never, None) => {}
            (_, Some(step)) => validation::validate_maximum_step_size(step)?,
            (estimation, None) => {
                return Err(crate::RegistrationError::invalid_configuration(format!(
                    "learning rate estimation {:?} requires a maximum step size",
                    estimation
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistrationConfig::default();
        assert_eq!(config.initialization, InitializationStrategy::Geometry);
        assert_eq!(config.number_of_histogram_bins, 50);
        assert_eq!(config.learning_rate, 1.0);
        assert_eq!(config.number_of_iterations, 500);
        assert_eq!(config.convergence_minimum_value, 1e-6);
        assert_eq!(config.convergence_window_size, 10);
        assert_eq!(config.sampling, SamplingStrategy::Full);
        assert!(config.maximum_step_size.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RegistrationConfig::new()
            .with_initialization(InitializationStrategy::Moments)
            .with_number_of_histogram_bins(32)
            .with_sampling(SamplingStrategy::Regular { step: 2 })
            .with_learning_rate_estimation(LearningRateEstimation::Once)
            .with_maximum_step_size(1.0);
        assert_eq!(config.initialization, InitializationStrategy::Moments);
        assert_eq!(config.number_of_histogram_bins, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(RegistrationConfig::new().with_number_of_histogram_bins(1).validate().is_err());
        assert!(RegistrationConfig::new().with_learning_rate(0.0).validate().is_err());
        assert!(RegistrationConfig::new().with_number_of_iterations(0).validate().is_err());
        assert!(RegistrationConfig::new().with_convergence_window_size(1).validate().is_err());
        assert!(RegistrationConfig::new().with_sampling(SamplingStrategy::Regular { step: 0 }).validate().is_err());
        assert!(RegistrationConfig::new()
            .with_learning_rate_estimation(LearningRateEstimation::EachIteration)
            .validate()
            .is_err());
    }
}
