//! Scaled gradient descent with windowed convergence monitoring.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::config::{LearningRateEstimation, RegistrationConfig};
use crate::error::{RegistrationError, Result};
use crate::metric::Metric;
use crate::progress::{CancellationToken, ProgressTracker};
use crate::validation::ConvergenceMonitor;
use super::scales::PhysicalShiftScales;

/// Why the optimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
    /// The convergence value fell below the configured minimum.
    Converged,
    /// The iteration budget ran out first. Not an error.
    MaximumIterations,
    /// The cancellation token was triggered.
    Cancelled,
    /// A non-finite value or step was produced.
    NumericalFailure,
}

impl StopCondition {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Converged => "converged: convergence value below minimum",
            Self::MaximumIterations => "did not converge: maximum number of iterations reached",
            Self::Cancelled => "cancelled",
            Self::NumericalFailure => "numerical failure",
        };
        f.write_str(text)
    }
}

/// Advisory summary of an optimisation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerDiagnostics {
    pub stop_condition: StopCondition,
    /// Completed iterations (metric evaluations followed by a step).
    pub iterations: usize,
    /// Last evaluated metric value.
    pub final_metric_value: f64,
    /// Last convergence value, once the window was full.
    pub convergence_value: Option<f64>,
    /// Learning rate in effect at the end.
    pub learning_rate: f64,
}

impl fmt::Display for OptimizerDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} iterations, metric {:.6}",
            self.stop_condition, self.iterations, self.final_metric_value
        )?;
        if let Some(c) = self.convergence_value {
            write!(f, ", convergence value {:.3e}", c)?;
        }
        Ok(())
    }
}

/// Final parameters and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub parameters: Vec<f64>,
    pub diagnostics: OptimizerDiagnostics,
}

/// Gradient descent over transform parameters.
///
/// Each iteration evaluates the metric and its derivative, feeds the value to
/// the convergence monitor and then moves
/// `p_i <- p_i - lr * g_i / scale_i`.
#[derive(Debug, Clone)]
pub struct GradientDescentOptimizer {
    learning_rate: f64,
    number_of_iterations: usize,
    convergence_minimum_value: f64,
    convergence_window_size: usize,
    learning_rate_estimation: LearningRateEstimation,
    maximum_step_size: Option<f64>,
    scales: PhysicalShiftScales,
}

impl GradientDescentOptimizer {
    pub fn new(config: &RegistrationConfig, scales: PhysicalShiftScales) -> Self {
        Self {
            learning_rate: config.learning_rate,
            number_of_iterations: config.number_of_iterations,
            convergence_minimum_value: config.convergence_minimum_value,
            convergence_window_size: config.convergence_window_size,
            learning_rate_estimation: config.learning_rate_estimation,
            maximum_step_size: config.maximum_step_size,
            scales,
        }
    }

    /// Minimise `metric` starting from `initial`.
    ///
    /// Non-convergence is reported through the diagnostics; only numerical
    /// failures are errors.
    pub fn optimize<M: Metric + ?Sized>(
        &self,
        metric: &M,
        initial: Vec<f64>,
        tracker: &mut ProgressTracker,
        cancellation: Option<&CancellationToken>,
    ) -> Result<OptimizationResult> {
        if initial.len() != metric.num_parameters() {
            return Err(RegistrationError::invalid_configuration(format!(
                "metric expects {} parameters, got {}",
                metric.num_parameters(),
                initial.len()
            )));
        }

        let scales = self.scales.estimate_scales();
        tracing::debug!("Parameter scales: {:?}", scales);

        let mut parameters = initial;
        let mut learning_rate = self.learning_rate;
        let mut monitor = ConvergenceMonitor::new(self.convergence_window_size);
        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut diagnostics = OptimizerDiagnostics {
            stop_condition: StopCondition::MaximumIterations,
            iterations: 0,
            final_metric_value: f64::NAN,
            convergence_value: None,
            learning_rate,
        };

        tracker.start();
        for iteration in 0..self.number_of_iterations {
            if cancellation.is_some_and(|token| token.is_cancelled()) {
                diagnostics.stop_condition = StopCondition::Cancelled;
                if let Some((value, best_parameters)) = best.take() {
                    diagnostics.final_metric_value = value;
                    parameters = best_parameters;
                }
                tracing::info!("Optimisation cancelled at iteration {}", iteration);
                break;
            }

            let evaluation = metric.value_and_derivative(&parameters)?;
            if evaluation.valid_samples == 0 {
                return Err(self.fail(tracker, diagnostics, "no fixed samples map inside the moving image"));
            }
            if !evaluation.value.is_finite() {
                diagnostics.final_metric_value = evaluation.value;
                return Err(self.fail(tracker, diagnostics, "metric value is not finite"));
            }
            if evaluation.derivative.iter().any(|g| !g.is_finite()) {
                diagnostics.final_metric_value = evaluation.value;
                return Err(self.fail(tracker, diagnostics, "metric derivative is not finite"));
            }

            diagnostics.final_metric_value = evaluation.value;
            if best.as_ref().map_or(true, |(value, _)| evaluation.value < *value) {
                best = Some((evaluation.value, parameters.clone()));
            }

            monitor.add_value(evaluation.value);
            diagnostics.convergence_value = monitor.convergence_value();
            tracker.update(
                iteration,
                Some(self.number_of_iterations),
                evaluation.value,
                diagnostics.convergence_value,
                learning_rate,
            );
            if diagnostics
                .convergence_value
                .is_some_and(|c| c < self.convergence_minimum_value)
            {
                diagnostics.stop_condition = StopCondition::Converged;
                break;
            }

            let scaled: Vec<f64> = evaluation
                .derivative
                .iter()
                .zip(&scales)
                .map(|(g, s)| g / s)
                .collect();
            let estimate = match self.learning_rate_estimation {
                LearningRateEstimation::Never => false,
                LearningRateEstimation::Once => iteration == 0,
                LearningRateEstimation::EachIteration => true,
            };
            if estimate {
                if let Some(max_step) = self.maximum_step_size {
                    let shift = self.scales.step_shift(&scaled);
                    if shift > f64::EPSILON {
                        learning_rate = max_step / shift;
                    }
                }
            }

            let mut step: Vec<f64> = scaled.iter().map(|g| g * learning_rate).collect();
            if let Some(max_step) = self.maximum_step_size {
                let shift = self.scales.step_shift(&step);
                if shift > max_step {
                    let factor = max_step / shift;
                    step.iter_mut().for_each(|s| *s *= factor);
                }
            }
            if step.iter().any(|s| !s.is_finite()) {
                return Err(self.fail(tracker, diagnostics, "parameter step is not finite"));
            }

            for (p, s) in parameters.iter_mut().zip(&step) {
                *p -= s;
            }
            diagnostics.iterations = iteration + 1;
            diagnostics.learning_rate = learning_rate;
        }

        match diagnostics.stop_condition {
            StopCondition::MaximumIterations => tracing::warn!(
                "Optimizer did not converge within {} iterations (convergence value {:?})",
                self.number_of_iterations,
                diagnostics.convergence_value
            ),
            _ => tracing::info!("Optimizer stopped: {}", diagnostics),
        }
        tracker.complete(diagnostics.iterations, diagnostics.final_metric_value, diagnostics.learning_rate);

        Ok(OptimizationResult { parameters, diagnostics })
    }

    fn fail(
        &self,
        tracker: &ProgressTracker,
        mut diagnostics: OptimizerDiagnostics,
        message: &str,
    ) -> RegistrationError {
        diagnostics.stop_condition = StopCondition::NumericalFailure;
        tracing::error!("Optimizer failed: {} ({})", message, diagnostics);
        tracker.error(message);
        RegistrationError::numerical_failure(message, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use bonereg_core::{Direction, ImageMetadata, Point, Spacing};
    use crate::metric::MetricEvaluation;
    use crate::progress::HistoryCallback;

    /// `sum_i w_i (p_i - target_i)^2` over 12 affine parameters.
    struct Quadratic {
        target: Vec<f64>,
    }

    impl Metric for Quadratic {
        fn num_parameters(&self) -> usize {
            12
        }

        fn value(&self, parameters: &[f64]) -> Result<MetricEvaluation> {
            let mut evaluation = self.value_and_derivative(parameters)?;
            evaluation.derivative.clear();
            Ok(evaluation)
        }

        fn value_and_derivative(&self, parameters: &[f64]) -> Result<MetricEvaluation> {
            let diff: Vec<f64> = parameters.iter().zip(&self.target).map(|(p, t)| p - t).collect();
            Ok(MetricEvaluation {
                value: diff.iter().map(|d| d * d).sum::<f64>() * 0.1 - 1.0,
                derivative: diff.iter().map(|d| 0.2 * d).collect(),
                valid_samples: 1,
            })
        }

        fn name(&self) -> &'static str {
            "Quadratic"
        }
    }

    struct Broken;

    impl Metric for Broken {
        fn num_parameters(&self) -> usize {
            12
        }

        fn value(&self, _parameters: &[f64]) -> Result<MetricEvaluation> {
            Ok(MetricEvaluation { value: f64::NAN, derivative: Vec::new(), valid_samples: 1 })
        }

        fn value_and_derivative(&self, parameters: &[f64]) -> Result<MetricEvaluation> {
            self.value(parameters)
        }

        fn name(&self) -> &'static str {
            "Broken"
        }
    }

    fn unit_scales() -> PhysicalShiftScales {
        // a single voxel domain: every matrix scale degenerates to 1
        let meta = ImageMetadata::new([1, 1, 1], Point::origin(), Spacing::uniform(1.0), Direction::identity());
        PhysicalShiftScales::new(&meta, &Point::origin())
    }

    fn identity() -> Vec<f64> {
        vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn test_descends_to_minimum() {
        let mut target = identity();
        target[9] = 2.0;
        target[10] = -1.0;
        let metric = Quadratic { target: target.clone() };
        let config = RegistrationConfig::new().with_learning_rate(2.0).with_number_of_iterations(200);
        let optimizer = GradientDescentOptimizer::new(&config, unit_scales());
        let result = optimizer
            .optimize(&metric, identity(), &mut ProgressTracker::new(), None)
            .unwrap();

        assert!(result.diagnostics.stop_condition.is_converged());
        assert!(result.diagnostics.iterations < 200);
        assert!((result.parameters[9] - 2.0).abs() < 1e-2);
        assert!((result.parameters[10] + 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_reports_maximum_iterations() {
        let mut target = identity();
        target[9] = 50.0;
        let metric = Quadratic { target };
        let config = RegistrationConfig::new().with_learning_rate(0.01).with_number_of_iterations(5);
        let history = Arc::new(HistoryCallback::new());
        let mut tracker = ProgressTracker::new();
        tracker.add_callback(history.clone());

        let result = GradientDescentOptimizer::new(&config, unit_scales())
            .optimize(&metric, identity(), &mut tracker, None)
            .unwrap();
        assert_eq!(result.diagnostics.stop_condition, StopCondition::MaximumIterations);
        assert_eq!(result.diagnostics.iterations, 5);
        assert_eq!(history.metric_values().len(), 5);
        assert!(result.parameters[9] > 0.0);
    }

    #[test]
    fn test_cancellation_returns_best_parameters() {
        let mut target = identity();
        target[9] = 5.0;
        let metric = Quadratic { target };
        let token = CancellationToken::new();
        token.cancel();
        let result = GradientDescentOptimizer::new(&RegistrationConfig::default(), unit_scales())
            .optimize(&metric, identity(), &mut ProgressTracker::new(), Some(&token))
            .unwrap();
        assert_eq!(result.diagnostics.stop_condition, StopCondition::Cancelled);
        assert_eq!(result.diagnostics.iterations, 0);
        assert_eq!(result.parameters, identity());
    }

    #[test]
    fn test_non_finite_metric_is_numerical_failure() {
        let err = GradientDescentOptimizer::new(&RegistrationConfig::default(), unit_scales())
            .optimize(&Broken, identity(), &mut ProgressTracker::new(), None)
            .unwrap_err();
        match err {
            RegistrationError::NumericalFailure { diagnostics, .. } => {
                assert_eq!(diagnostics.stop_condition, StopCondition::NumericalFailure);
                assert_eq!(diagnostics.iterations, 0);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_maximum_step_size_limits_shift() {
        let mut target = identity();
        target[9] = 100.0;
        let metric = Quadratic { target };
        let config = RegistrationConfig::new()
            .with_number_of_iterations(1)
            .with_learning_rate_estimation(LearningRateEstimation::Once)
            .with_maximum_step_size(0.5);
        let result = GradientDescentOptimizer::new(&config, unit_scales())
            .optimize(&metric, identity(), &mut ProgressTracker::new(), None)
            .unwrap();
        assert!((result.parameters[9] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parameter_count_is_checked() {
        let metric = Quadratic { target: identity() };
        let result = GradientDescentOptimizer::new(&RegistrationConfig::default(), unit_scales())
            .optimize(&metric, vec![0.0; 3], &mut ProgressTracker::new(), None);
        assert!(matches!(result, Err(RegistrationError::InvalidConfiguration(_))));
    }
}
