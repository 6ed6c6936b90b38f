//! Spacing between adjacent voxels along each axis.

use super::Vector;

/// Physical distance between neighbouring voxels along each index axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing along every axis.
    pub fn uniform(value: f64) -> Self {
        let mut spacing = Vector::zeros();
        for i in 0..D {
            spacing[i] = value;
        }
        spacing
    }

    /// Smallest spacing component.
    pub fn min_spacing(&self) -> f64 {
        self.0.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Physical volume (or area) of a single voxel.
    pub fn voxel_volume(&self) -> f64 {
        self.0.iter().product()
    }
}
