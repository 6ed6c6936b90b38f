//! Parameter scales from physical shift.
//!
//! For a centered affine transform with parameters `[A (row-major), t]`,
//! moving a point `x` by a parameter step `dp` shifts it by
//! `dA (x - c) + dt`. Shifts are measured at the corners of the fixed image
//! domain, where they are largest.

use bonereg_core::{AffineTransform, ImageMetadata, Point};

const D: usize = 3;

/// Estimates per-parameter scales and step sizes in physical units.
#[derive(Debug, Clone)]
pub struct PhysicalShiftScales {
    /// Corner offsets from the transform centre.
    offsets: Vec<[f64; D]>,
}

impl PhysicalShiftScales {
    /// Use the corners of `fixed` around the transform centre `center`.
    pub fn new(fixed: &ImageMetadata<3>, center: &Point<3>) -> Self {
        let mut offsets = Vec::with_capacity(8);
        for corner in 0..8 {
            let mut index = Point::<3>::origin();
            for axis in 0..D {
                if corner & (1 << axis) != 0 {
                    index[axis] = fixed.size[axis].saturating_sub(1) as f64;
                }
            }
            let point = fixed.index_to_physical(&index);
            offsets.push([point[0] - center[0], point[1] - center[1], point[2] - center[2]]);
        }
        Self { offsets }
    }

    pub fn num_parameters(&self) -> usize {
        AffineTransform::<3>::num_parameters()
    }

    /// `scale_i = max over corners of |d x' / d p_i|^2`.
    ///
    /// For matrix entry `(r, c)` that is the largest squared corner offset
    /// along `c`; translations have unit scale. Degenerate (zero) scales are
    /// replaced by one.
    pub fn estimate_scales(&self) -> Vec<f64> {
        let mut scales = vec![1.0; self.num_parameters()];
        for r in 0..D {
            for c in 0..D {
                let max = self.offsets.iter().map(|o| o[c] * o[c]).fold(0.0, f64::max);
                scales[r * D + c] = if max > 0.0 { max } else { 1.0 };
            }
        }
        scales
    }

    /// Largest physical displacement produced by the parameter step `step`.
    pub fn step_shift(&self, step: &[f64]) -> f64 {
        self.offsets
            .iter()
            .map(|o| {
                let mut norm_sq = 0.0;
                for r in 0..D {
                    let mut shift = step[D * D + r];
                    for c in 0..D {
                        shift += step[r * D + c] * o[c];
                    }
                    norm_sq += shift * shift;
                }
                norm_sq.sqrt()
            })
            .fold(0.0, f64::max)
    }
}
