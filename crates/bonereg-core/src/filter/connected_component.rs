//! Connected component labelling of binary masks.

use std::collections::VecDeque;
use burn::tensor::backend::Backend;
use crate::error::Result;
use crate::image::{Image, PixelType};
use super::morphology::binary_voxels;
use super::voxel_grid::VoxelGrid;

/// Label face-connected (6-neighbour) foreground components.
///
/// Labels start at 1 and follow raster order of each component's first
/// voxel. Returns the label volume and the number of components.
pub fn label_components(mask: &[u8], size: [usize; 3]) -> (Vec<u32>, u32) {
    let grid = VoxelGrid::new(size);
    let mut labels = vec![0u32; grid.len()];
    let mut next_label = 0u32;
    let mut queue = VecDeque::new();

    for seed in 0..grid.len() {
        if mask[seed] == 0 || labels[seed] != 0 {
            continue;
        }
        next_label += 1;
        labels[seed] = next_label;
        queue.push_back(seed);
        while let Some(flat) = queue.pop_front() {
            for next in grid.face_neighbors(flat) {
                if mask[next] != 0 && labels[next] == 0 {
                    labels[next] = next_label;
                    queue.push_back(next);
                }
            }
        }
    }

    (labels, next_label)
}

/// Produces a UInt32 label map from a binary mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedComponentFilter;

impl ConnectedComponentFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn apply<B: Backend>(&self, mask: &Image<B, 3>) -> Result<Image<B, 3>> {
        let voxels = binary_voxels(mask)?;
        let (labels, count) = label_components(&voxels, mask.size());
        tracing::debug!("Connected components: {} found", count);
        let values = labels.into_iter().map(|l| l as f32).collect();
        Image::from_voxels(values, &mask.metadata(), PixelType::UInt32, &mask.device())
    }
}
