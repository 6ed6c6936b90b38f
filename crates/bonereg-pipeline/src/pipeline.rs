//! Bone-focused linear registration pipeline.
//!
//! Stages, in order:
//! 1. segment and clean a bone mask for every side without one
//! 2. crop both volumes to the mask ROI, halving auto-segmented sides
//!    laterally (image and mask always share the crop)
//! 3. optionally downsample the ROI pair
//! 4. estimate the affine transform on the ROI pair
//! 5. resample the full moving volume and mask onto the fixed grid

use std::marker::PhantomData;
use std::sync::Arc;
use burn::tensor::backend::{AutodiffBackend, Backend};
use bonereg_core::filter::{DownsampleFilter, HuThresholdSegmenter, LateralCropper, MaskCleaningFilter, RoiExtractor};
use bonereg_core::interpolation::InterpolationMode;
use bonereg_core::{AffineTransform, Image};
use bonereg_registration::{
    AffineRegistration, CancellationToken, OptimizerDiagnostics, ProgressCallback, Result,
};
use crate::config::PipelineConfig;
use crate::transform_applier::apply_linear_transform;

/// Everything the pipeline produces, on the fixed grid.
#[derive(Debug, Clone)]
pub struct LinearRegistrationOutput<B: AutodiffBackend> {
    /// Full moving volume resampled linearly.
    pub registered_image: Image<B, 3>,
    /// Full moving mask resampled with nearest neighbour.
    pub registered_mask: Image<B, 3>,
    /// Maps fixed physical points to moving physical points.
    pub affine_transform: AffineTransform<3>,
    /// The generated fixed mask; `None` when the caller supplied one.
    pub fixed_mask: Option<Image<B, 3>>,
    pub diagnostics: OptimizerDiagnostics,
}

/// Threshold, close, fill and clean `image` into a bone mask.
pub fn auto_segment<B: Backend>(image: &Image<B, 3>, config: &PipelineConfig) -> Result<Image<B, 3>> {
    let mask = HuThresholdSegmenter::new(&config.segmentation)?.apply(image)?;
    Ok(MaskCleaningFilter::new(&config.cleaning)?.apply(&mask)?)
}

/// Orchestrates segmentation, cropping, estimation and resampling.
pub struct LinearRegistrationPipeline<B: AutodiffBackend> {
    config: PipelineConfig,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    cancellation: Option<CancellationToken>,
    _phantom: PhantomData<B>,
}

impl<B: AutodiffBackend> LinearRegistrationPipeline<B> {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            callbacks: Vec::new(),
            cancellation: None,
            _phantom: PhantomData,
        })
    }

    /// Forward optimiser progress to `callback`.
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Register `moving` to `fixed`.
    ///
    /// Missing masks are generated from the images. Supplied masks must be
    /// on their image's grid.
    pub fn register(
        &self,
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
        fixed_mask: Option<&Image<B, 3>>,
        moving_mask: Option<&Image<B, 3>>,
    ) -> Result<LinearRegistrationOutput<B>> {
        let (fixed_mask, fixed_generated) = self.resolve_mask(fixed, fixed_mask, "fixed")?;
        let (moving_mask, moving_generated) = self.resolve_mask(moving, moving_mask, "moving")?;

        let (fixed_roi, fixed_roi_mask) = self.crop(fixed, &fixed_mask, fixed_generated)?;
        let (moving_roi, moving_roi_mask) = self.crop(moving, &moving_mask, moving_generated)?;
        tracing::info!("ROI sizes: fixed {:?}, moving {:?}", fixed_roi.size(), moving_roi.size());

        let (fixed_roi, fixed_roi_mask) = self.downsample(fixed_roi, fixed_roi_mask)?;
        let (moving_roi, moving_roi_mask) = self.downsample(moving_roi, moving_roi_mask)?;

        let mut registration = AffineRegistration::<B>::new(self.config.registration.clone())?;
        for callback in &self.callbacks {
            registration = registration.with_callback(callback.clone());
        }
        if let Some(token) = &self.cancellation {
            registration = registration.with_cancellation(token.clone());
        }
        let result = registration.execute(
            &fixed_roi,
            &moving_roi,
            self.config.use_fixed_metric_mask.then_some(&fixed_roi_mask),
            self.config.use_moving_metric_mask.then_some(&moving_roi_mask),
        )?;

        tracing::info!("Resampling moving volume and mask onto the fixed grid");
        let registered_image = apply_linear_transform(moving, &result.transform, fixed, false)?;
        let registered_mask = apply_linear_transform(&moving_mask, &result.transform, fixed, true)?;

        Ok(LinearRegistrationOutput {
            registered_image,
            registered_mask,
            affine_transform: result.transform,
            fixed_mask: fixed_generated.then_some(fixed_mask),
            diagnostics: result.diagnostics,
        })
    }

    fn resolve_mask(
        &self,
        image: &Image<B, 3>,
        mask: Option<&Image<B, 3>>,
        side: &str,
    ) -> Result<(Image<B, 3>, bool)> {
        match mask {
            Some(mask) => Ok((mask.clone(), false)),
            None => {
                tracing::info!("No {} mask supplied; segmenting bone", side);
                Ok((auto_segment(image, &self.config)?, true))
            }
        }
    }

    fn crop(&self, image: &Image<B, 3>, mask: &Image<B, 3>, generated: bool) -> Result<(Image<B, 3>, Image<B, 3>)> {
        let (image, mask) = RoiExtractor::new(self.config.roi.pad)
            .with_labels(self.config.roi.labels.clone())
            .crop_multi(image, mask)?;
        if !generated {
            return Ok((image, mask));
        }
        let lateral = LateralCropper::new(self.config.roi.lateral_side, self.config.roi.lateral_pad);
        Ok((lateral.apply(&image)?, lateral.apply(&mask)?))
    }

    fn downsample(&self, image: Image<B, 3>, mask: Image<B, 3>) -> Result<(Image<B, 3>, Image<B, 3>)> {
        match self.config.registration_downsample_factor {
            Some(factor) => {
                let filter = DownsampleFilter::new(factor)?;
                Ok((
                    filter.apply(&image, InterpolationMode::Linear)?,
                    filter.apply(&mask, InterpolationMode::NearestNeighbor)?,
                ))
            }
            None => Ok((image, mask)),
        }
    }
}

/// One-shot form of [`LinearRegistrationPipeline::register`].
pub fn register_linear<B: AutodiffBackend>(
    fixed: &Image<B, 3>,
    moving: &Image<B, 3>,
    fixed_mask: Option<&Image<B, 3>>,
    moving_mask: Option<&Image<B, 3>>,
    config: &PipelineConfig,
) -> Result<LinearRegistrationOutput<B>> {
    LinearRegistrationPipeline::new(config.clone())?.register(fixed, moving, fixed_mask, moving_mask)
}
