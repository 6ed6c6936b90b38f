//! Parameter validation and convergence monitoring.

use std::collections::VecDeque;
use crate::error::{RegistrationError, Result};

/// Validate learning rate.
pub fn validate_learning_rate(lr: f64) -> Result<()> {
    if !lr.is_finite() || lr <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Learning rate must be positive, got {}",
            lr
        )));
    }
    Ok(())
}

/// Validate iteration count.
pub fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(RegistrationError::invalid_configuration("Iterations must be positive"));
    }
    if iterations > 1_000_000 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Iterations too large: {}",
            iterations
        )));
    }
    Ok(())
}

/// Validate histogram parameters for mutual information.
pub fn validate_histogram_params(num_bins: usize, parzen_sigma: f64) -> Result<()> {
    if num_bins < 2 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Number of bins must be at least 2, got {}",
            num_bins
        )));
    }
    if num_bins > 1024 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Number of bins too large: {}",
            num_bins
        )));
    }
    if !parzen_sigma.is_finite() || parzen_sigma <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Parzen sigma must be positive, got {}",
            parzen_sigma
        )));
    }
    Ok(())
}

/// Validate the convergence criterion.
pub fn validate_convergence(minimum_value: f64, window_size: usize) -> Result<()> {
    if !minimum_value.is_finite() || minimum_value < 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Convergence minimum value must be non-negative, got {}",
            minimum_value
        )));
    }
    if window_size < 2 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Convergence window must hold at least 2 values, got {}",
            window_size
        )));
    }
    Ok(())
}

pub fn validate_sampling_step(step: usize) -> Result<()> {
    if step == 0 {
        return Err(RegistrationError::invalid_configuration("Sampling step must be positive"));
    }
    Ok(())
}

pub fn validate_maximum_step_size(step: f64) -> Result<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Maximum step size must be positive, got {}",
            step
        )));
    }
    Ok(())
}

/// Windowed convergence monitor.
///
/// Each metric value is divided by the running sum of absolute metric values
/// seen so far. The convergence value is the absolute slope of the
/// least-squares line through the last `window_size` normalised values.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    window_size: usize,
    energy: f64,
    window: VecDeque<f64>,
}

impl ConvergenceMonitor {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            energy: 0.0,
            window: VecDeque::with_capacity(window_size),
        }
    }

    pub fn add_value(&mut self, value: f64) {
        self.energy += value.abs();
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.window_size
    }

    /// `None` until the window is full.
    pub fn convergence_value(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        if self.energy == 0.0 {
            return Some(0.0);
        }

        let n = self.window.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = self.window.iter().sum::<f64>() / (n * self.energy);
        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (i, value) in self.window.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxy += dx * (value / self.energy - mean_y);
            sxx += dx * dx;
        }
        Some((sxy / sxx).abs())
    }

    pub fn clear(&mut self) {
        self.energy = 0.0;
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_learning_rate() {
        assert!(validate_learning_rate(0.01).is_ok());
        assert!(validate_learning_rate(1.0).is_ok());
        assert!(validate_learning_rate(0.0).is_err());
        assert!(validate_learning_rate(-0.01).is_err());
        assert!(validate_learning_rate(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_iterations() {
        assert!(validate_iterations(100).is_ok());
        assert!(validate_iterations(0).is_err());
        assert!(validate_iterations(2_000_000).is_err());
    }

    #[test]
    fn test_validate_histogram_params() {
        assert!(validate_histogram_params(50, 1.0).is_ok());
        assert!(validate_histogram_params(1, 1.0).is_err());
        assert!(validate_histogram_params(2000, 1.0).is_err());
        assert!(validate_histogram_params(50, 0.0).is_err());
    }

    #[test]
    fn test_monitor_waits_for_full_window() {
        let mut monitor = ConvergenceMonitor::new(3);
        monitor.add_value(-1.0);
        monitor.add_value(-1.0);
        assert_eq!(monitor.convergence_value(), None);
        monitor.add_value(-1.0);
        assert_eq!(monitor.convergence_value(), Some(0.0));
    }

    #[test]
    fn test_monitor_slope_of_normalised_values() {
        let mut monitor = ConvergenceMonitor::new(3);
        for v in [1.0, 2.0, 3.0] {
            monitor.add_value(v);
        }
        // values / 6 have slope 1/6
        let value = monitor.convergence_value().unwrap();
        assert!((value - 1.0 / 6.0).abs() < 1e-12);

        monitor.add_value(4.0);
        // window [2, 3, 4] over energy 10
        let value = monitor.convergence_value().unwrap();
        assert!((value - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_monitor_zero_energy() {
        let mut monitor = ConvergenceMonitor::new(2);
        monitor.add_value(0.0);
        monitor.add_value(0.0);
        assert_eq!(monitor.convergence_value(), Some(0.0));
        monitor.clear();
        assert!(!monitor.is_full());
    }
}
