//! Overlap measures between masks.

use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::Image;

/// Dice coefficient `2|A∩B| / (|A| + |B|)` over nonzero voxels.
///
/// Both masks must share a grid. Two empty masks give 1.0.
pub fn dice_coefficient<B: Backend>(a: &Image<B, 3>, b: &Image<B, 3>) -> Result<f64> {
    if !a.is_same_grid(b) {
        return Err(ImageError::geometry_mismatch(
            "dice coefficient needs masks on the same grid",
        ));
    }
    let a = a.to_vec()?;
    let b = b.to_vec()?;
    let (mut size_a, mut size_b, mut both) = (0usize, 0usize, 0usize);
    for (&va, &vb) in a.iter().zip(b.iter()) {
        let (ia, ib) = (va != 0.0, vb != 0.0);
        size_a += usize::from(ia);
        size_b += usize::from(ib);
        both += usize::from(ia && ib);
    }
    if size_a + size_b == 0 {
        return Ok(1.0);
    }
    Ok(2.0 * both as f64 / (size_a + size_b) as f64)
}
