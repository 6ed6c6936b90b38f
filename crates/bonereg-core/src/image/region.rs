//! Index-space regions.

use crate::error::{ImageError, Result};

/// Axis-aligned box in index space, `start` inclusive, `size` voxels long.
///
/// Components are in index order (x, y, z), i.e. the reverse of the tensor
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox<const D: usize> {
    pub start: [usize; D],
    pub size: [usize; D],
}

impl<const D: usize> BoundingBox<D> {
    pub fn new(start: [usize; D], size: [usize; D]) -> Self {
        Self { start, size }
    }

    /// Box covering an entire image of the given size.
    pub fn full(size: [usize; D]) -> Self {
        Self { start: [0; D], size }
    }

    /// Exclusive end index along each axis.
    pub fn end(&self) -> [usize; D] {
        std::array::from_fn(|i| self.start[i] + self.size[i])
    }

    pub fn is_empty(&self) -> bool {
        self.size.iter().any(|&s| s == 0)
    }

    /// Number of voxels inside the box.
    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    pub fn contains(&self, index: [usize; D]) -> bool {
        (0..D).all(|i| index[i] >= self.start[i] && index[i] < self.start[i] + self.size[i])
    }

    /// Smallest box enclosing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        let end = self.end();
        let other_end = other.end();
        let start: [usize; D] = std::array::from_fn(|i| self.start[i].min(other.start[i]));
        let size = std::array::from_fn(|i| end[i].max(other_end[i]) - start[i]);
        Self { start, size }
    }

    /// Grow the box by `pad` voxels on every face and clip it to an image.
    ///
    /// The start is clamped at zero and the size is `box + 2 * pad`, capped
    /// by what remains of the image after the start.
    pub fn pad_and_clip(&self, pad: usize, image_size: [usize; D]) -> Self {
        let start: [usize; D] = std::array::from_fn(|i| self.start[i].saturating_sub(pad));
        let size = std::array::from_fn(|i| {
            (image_size[i].saturating_sub(start[i])).min(self.size[i] + 2 * pad)
        });
        Self { start, size }
    }

    /// Fail unless the box is non-empty and lies inside an image of `image_size`.
    pub fn check_within(&self, image_size: [usize; D]) -> Result<()> {
        if self.is_empty() {
            return Err(ImageError::region_out_of_bounds(format!(
                "region {:?} has an empty size",
                self
            )));
        }
        let end = self.end();
        if (0..D).any(|i| end[i] > image_size[i]) {
            return Err(ImageError::region_out_of_bounds(format!(
                "region start {:?} size {:?} exceeds image size {:?}",
                self.start, self.size, image_size
            )));
        }
        Ok(())
    }
}
