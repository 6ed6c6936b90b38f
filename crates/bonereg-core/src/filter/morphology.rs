//! Binary morphology with box structuring elements.
//!
//! A box is separable, so dilation and erosion run as three 1D sweeps, each
//! a sliding count over prefix sums. Lines are processed in parallel.

use std::collections::VecDeque;
use burn::tensor::backend::Backend;
use rayon::prelude::*;
use crate::error::{ImageError, Result};
use crate::image::{Image, ImageMetadata, PixelType};
use super::voxel_grid::VoxelGrid;

/// Box-shaped structuring element, radius per axis in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    radius: [usize; 3],
}

impl StructuringElement {
    /// Cube of side `2 * radius + 1`.
    pub fn cube(radius: i32) -> Result<Self> {
        if radius < 0 {
            return Err(ImageError::validation(format!(
                "structuring element radius must be non-negative, got {}",
                radius
            )));
        }
        Ok(Self {
            radius: [radius as usize; 3],
        })
    }

    pub fn radius(&self) -> [usize; 3] {
        self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Dilate,
    /// Out-of-grid voxels count as foreground.
    Erode,
}

fn sweep_line(line: &[u8], radius: usize, kind: Sweep) -> Vec<u8> {
    let n = line.len();
    let mut prefix = vec![0usize; n + 1];
    for i in 0..n {
        prefix[i + 1] = prefix[i] + usize::from(line[i] != 0);
    }
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(n);
            let foreground = prefix[hi] - prefix[lo];
            let hit = match kind {
                Sweep::Dilate => foreground > 0,
                Sweep::Erode => foreground == hi - lo,
            };
            u8::from(hit)
        })
        .collect()
}

fn sweep(data: &[u8], grid: &VoxelGrid, axis: usize, radius: usize, kind: Sweep) -> Vec<u8> {
    if radius == 0 {
        return data.to_vec();
    }
    let (len, stride, bases) = grid.lines(axis);
    let lines: Vec<Vec<u8>> = bases
        .par_iter()
        .map(|&base| {
            let line: Vec<u8> = (0..len).map(|i| data[base + i * stride]).collect();
            sweep_line(&line, radius, kind)
        })
        .collect();
    let mut out = vec![0u8; data.len()];
    for (base, line) in bases.iter().zip(lines) {
        for (i, v) in line.into_iter().enumerate() {
            out[base + i * stride] = v;
        }
    }
    out
}

fn apply_box(data: &[u8], size: [usize; 3], element: &StructuringElement, kind: Sweep) -> Vec<u8> {
    let grid = VoxelGrid::new(size);
    let radius = element.radius();
    let mut out = data.to_vec();
    for axis in 0..3 {
        out = sweep(&out, &grid, axis, radius[axis], kind);
    }
    out
}

/// Binary dilation. Voxels outside the grid are background.
pub fn dilate(mask: &[u8], size: [usize; 3], element: &StructuringElement) -> Vec<u8> {
    apply_box(mask, size, element, Sweep::Dilate)
}

/// Binary erosion. Voxels outside the grid are foreground, so objects
/// touching the border are not eaten from outside.
pub fn erode(mask: &[u8], size: [usize; 3], element: &StructuringElement) -> Vec<u8> {
    apply_box(mask, size, element, Sweep::Erode)
}

/// Dilation followed by erosion on a grid padded by the element radius, so
/// that structures near the border close the same way as interior ones.
pub fn close(mask: &[u8], size: [usize; 3], element: &StructuringElement) -> Vec<u8> {
    let r = element.radius();
    let padded_size = [size[0] + 2 * r[0], size[1] + 2 * r[1], size[2] + 2 * r[2]];
    let grid = VoxelGrid::new(size);
    let padded_grid = VoxelGrid::new(padded_size);

    let mut padded = vec![0u8; padded_grid.len()];
    for (flat, &v) in mask.iter().enumerate() {
        let [x, y, z] = grid.coords(flat);
        padded[padded_grid.flat(x + r[0], y + r[1], z + r[2])] = u8::from(v != 0);
    }

    let closed = erode(&dilate(&padded, padded_size, element), padded_size, element);

    (0..grid.len())
        .map(|flat| {
            let [x, y, z] = grid.coords(flat);
            closed[padded_grid.flat(x + r[0], y + r[1], z + r[2])]
        })
        .collect()
}

/// Set to foreground every background voxel that cannot reach the grid
/// border through face-connected background.
pub fn fill_holes(mask: &[u8], size: [usize; 3]) -> Vec<u8> {
    let grid = VoxelGrid::new(size);
    let mut reached = vec![false; grid.len()];
    let mut queue = VecDeque::new();

    for flat in 0..grid.len() {
        if mask[flat] == 0 && grid.on_boundary(flat) {
            reached[flat] = true;
            queue.push_back(flat);
        }
    }

    while let Some(flat) = queue.pop_front() {
        for next in grid.face_neighbors(flat) {
            if mask[next] == 0 && !reached[next] {
                reached[next] = true;
                queue.push_back(next);
            }
        }
    }

    mask.iter()
        .zip(reached.iter())
        .map(|(&m, &r)| u8::from(m != 0 || !r))
        .collect()
}

pub(crate) fn binary_voxels<B: Backend>(mask: &Image<B, 3>) -> Result<Vec<u8>> {
    Ok(mask.to_vec()?.into_iter().map(|v| u8::from(v != 0.0)).collect())
}

pub(crate) fn mask_from_binary<B: Backend>(
    voxels: Vec<u8>,
    metadata: &ImageMetadata<3>,
    device: &B::Device,
) -> Result<Image<B, 3>> {
    let values = voxels.into_iter().map(f32::from).collect();
    Image::from_voxels(values, metadata, PixelType::UInt8, device)
}

/// Morphological closing of a binary mask with a box element.
#[derive(Debug, Clone, Copy)]
pub struct BinaryMorphologicalClosingFilter {
    element: StructuringElement,
}

impl BinaryMorphologicalClosingFilter {
    pub fn new(element: StructuringElement) -> Self {
        Self { element }
    }

    pub fn apply<B: Backend>(&self, mask: &Image<B, 3>) -> Result<Image<B, 3>> {
        let voxels = binary_voxels(mask)?;
        let closed = close(&voxels, mask.size(), &self.element);
        mask_from_binary(closed, &mask.metadata(), &mask.device())
    }
}

/// Fills enclosed background cavities of a binary mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFillholeFilter;

impl BinaryFillholeFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn apply<B: Backend>(&self, mask: &Image<B, 3>) -> Result<Image<B, 3>> {
        let voxels = binary_voxels(mask)?;
        let filled = fill_holes(&voxels, mask.size());
        mask_from_binary(filled, &mask.metadata(), &mask.device())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(size: [usize; 3], on: &[[usize; 3]]) -> Vec<u8> {
        let grid = VoxelGrid::new(size);
        let mut v = vec![0u8; grid.len()];
        for &[x, y, z] in on {
            v[grid.flat(x, y, z)] = 1;
        }
        v
    }

    #[test]
    fn test_negative_radius_is_rejected() {
        assert!(matches!(StructuringElement::cube(-1), Err(ImageError::Validation(_))));
        assert_eq!(StructuringElement::cube(0).unwrap().radius(), [0, 0, 0]);
    }

    #[test]
    fn test_dilate_single_voxel_gives_cube() {
        let size = [7, 7, 7];
        let mask = volume(size, &[[3, 3, 3]]);
        let out = dilate(&mask, size, &StructuringElement::cube(1).unwrap());
        assert_eq!(out.iter().filter(|&&v| v == 1).count(), 27);
        let grid = VoxelGrid::new(size);
        assert_eq!(out[grid.flat(2, 4, 2)], 1);
        assert_eq!(out[grid.flat(1, 3, 3)], 0);
    }

    #[test]
    fn test_erode_keeps_border_objects() {
        let size = [4, 4, 4];
        let mask = vec![1u8; 64];
        let out = erode(&mask, size, &StructuringElement::cube(1).unwrap());
        assert!(out.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_close_bridges_gap() {
        let size = [9, 3, 3];
        let mask = volume(size, &[[2, 1, 1], [3, 1, 1], [5, 1, 1], [6, 1, 1]]);
        let out = close(&mask, size, &StructuringElement::cube(1).unwrap());
        let grid = VoxelGrid::new(size);
        assert_eq!(out[grid.flat(4, 1, 1)], 1);
        assert_eq!(out[grid.flat(1, 1, 1)], 0);
        assert_eq!(out[grid.flat(7, 1, 1)], 0);
    }

    #[test]
    fn test_close_at_border_keeps_shape() {
        let size = [5, 5, 5];
        let grid = VoxelGrid::new(size);
        let on: Vec<[usize; 3]> = (0..5).map(|x| [x, 0, 0]).collect();
        let mask = volume(size, &on);
        let out = close(&mask, size, &StructuringElement::cube(2).unwrap());
        assert_eq!(out, mask);
        assert_eq!(out[grid.flat(4, 0, 0)], 1);
    }

    #[test]
    fn test_fill_holes_fills_cavity_only() {
        let size = [5, 5, 5];
        let grid = VoxelGrid::new(size);
        let mut mask = vec![0u8; grid.len()];
        for z in 1..4 {
            for y in 1..4 {
                for x in 1..4 {
                    mask[grid.flat(x, y, z)] = 1;
                }
            }
        }
        mask[grid.flat(2, 2, 2)] = 0;
        let out = fill_holes(&mask, size);
        assert_eq!(out[grid.flat(2, 2, 2)], 1);
        assert_eq!(out[grid.flat(0, 0, 0)], 0);
        assert_eq!(out.iter().filter(|&&v| v == 1).count(), 27);
    }

    #[test]
    fn test_fill_holes_leaves_open_channel() {
        let size = [5, 5, 3];
        let grid = VoxelGrid::new(size);
        let mut mask = vec![0u8; grid.len()];
        for y in 0..5 {
            for x in 0..5 {
                if x == 0 || x == 4 || y == 0 || y == 4 {
                    mask[grid.flat(x, y, 1)] = 1;
                }
            }
        }
        // the ring is open along z, so its inside touches the border
        let out = fill_holes(&mask, size);
        assert_eq!(out[grid.flat(2, 2, 1)], 0);
    }
}
