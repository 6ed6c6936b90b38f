//! Affine registration driver.

use std::marker::PhantomData;
use std::sync::Arc;
use burn::tensor::backend::AutodiffBackend;
use bonereg_core::{AffineTransform, Image, PixelType};
use crate::config::RegistrationConfig;
use crate::error::Result;
use crate::initializer::CenteredTransformInitializer;
use crate::metric::{MattesMutualInformation, Metric, MetricMasks, MetricSettings};
use crate::optimizer::{GradientDescentOptimizer, OptimizerDiagnostics, PhysicalShiftScales};
use crate::progress::{CancellationToken, ConsoleProgressCallback, ProgressCallback, ProgressTracker};

/// Estimated transform plus optimiser diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    /// Maps fixed physical points to moving physical points.
    pub transform: AffineTransform<3>,
    pub diagnostics: OptimizerDiagnostics,
}

/// Estimates a 12-parameter affine transform aligning `moving` to `fixed`
/// by minimising negative Mattes mutual information.
pub struct AffineRegistration<B: AutodiffBackend> {
    config: RegistrationConfig,
    tracker: ProgressTracker,
    cancellation: Option<CancellationToken>,
    _phantom: PhantomData<B>,
}

impl<B: AutodiffBackend> AffineRegistration<B> {
    /// Validates `config`. Progress is logged every `config.log_interval`
    /// iterations.
    pub fn new(config: RegistrationConfig) -> Result<Self> {
        config.validate()?;
        let mut tracker = ProgressTracker::new();
        tracker.add_callback(Arc::new(ConsoleProgressCallback::new(config.log_interval)));
        Ok(Self {
            config,
            tracker,
            cancellation: None,
            _phantom: PhantomData,
        })
    }

    /// Register an additional progress callback.
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.tracker.add_callback(callback);
        self
    }

    /// Poll `token` once per iteration.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Run the registration.
    ///
    /// `fixed_mask` restricts the fixed samples; `moving_mask` discards
    /// samples mapping outside it. Both images are treated as Float32.
    pub fn execute(
        &mut self,
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
        fixed_mask: Option<&Image<B, 3>>,
        moving_mask: Option<&Image<B, 3>>,
    ) -> Result<RegistrationResult> {
        let fixed = fixed.cast(PixelType::Float32)?;
        let moving = moving.cast(PixelType::Float32)?;

        let initial = CenteredTransformInitializer::new(self.config.initialization).initialize(&fixed, &moving)?;
        let center = *initial.center();

        let metric = MattesMutualInformation::new(
            &fixed,
            &moving,
            MetricMasks { fixed: fixed_mask, moving: moving_mask },
            center,
            &MetricSettings::from(&self.config),
        )?;
        tracing::info!(
            "Registering {:?} onto {:?} with {} ({} samples)",
            moving.size(),
            fixed.size(),
            metric.name(),
            metric.num_samples()
        );

        let scales = PhysicalShiftScales::new(&fixed.metadata(), &center);
        let optimizer = GradientDescentOptimizer::new(&self.config, scales);
        let result = optimizer.optimize(&metric, initial.parameters(), &mut self.tracker, self.cancellation.as_ref())?;

        let transform = AffineTransform::from_parameters(&result.parameters, center)?;
        tracing::info!(
            "Registration finished: {}; translation {:?}",
            result.diagnostics,
            transform.translation().to_vec()
        );
        Ok(RegistrationResult {
            transform,
            diagnostics: result.diagnostics,
        })
    }
}
