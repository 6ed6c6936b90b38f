//! Per-label shape statistics.

use std::collections::BTreeMap;
use burn::tensor::backend::Backend;
use crate::error::Result;
use crate::image::{BoundingBox, Image, ImageMetadata};
use crate::spatial::Point;
use super::voxel_grid::VoxelGrid;

/// Shape measurements of one label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelShape {
    pub label: u32,
    pub voxel_count: usize,
    /// Tight index-space box around the label.
    pub bounding_box: BoundingBox<3>,
    /// Voxel count times voxel volume.
    pub physical_size: f64,
    /// Physical extent of the index box corners (min, max).
    pub physical_bounding_box: (Point<3>, Point<3>),
    /// Mean physical position of the label's voxels.
    pub centroid: Point<3>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelStatistics {
    shapes: BTreeMap<u32, LabelShape>,
}

struct Accumulator {
    count: usize,
    min: [usize; 3],
    max: [usize; 3],
    sum: [f64; 3],
}

impl LabelStatistics {
    /// Gather statistics for every nonzero label of a mask image.
    pub fn compute<B: Backend>(mask: &Image<B, 3>) -> Result<Self> {
        Ok(Self::from_voxels(&mask.to_vec()?, &mask.metadata()))
    }

    /// Gather statistics from raster-ordered label values. Values are
    /// rounded to the nearest integer; zero and negative values are background.
    pub fn from_voxels(labels: &[f32], metadata: &ImageMetadata<3>) -> Self {
        let grid = VoxelGrid::new(metadata.size);
        let mut acc: BTreeMap<u32, Accumulator> = BTreeMap::new();
        for (flat, &value) in labels.iter().enumerate() {
            let rounded = value.round();
            if rounded < 1.0 {
                continue;
            }
            let xyz = grid.coords(flat);
            let entry = acc.entry(rounded as u32).or_insert(Accumulator {
                count: 0,
                min: xyz,
                max: xyz,
                sum: [0.0; 3],
            });
            entry.count += 1;
            for i in 0..3 {
                entry.min[i] = entry.min[i].min(xyz[i]);
                entry.max[i] = entry.max[i].max(xyz[i]);
                entry.sum[i] += xyz[i] as f64;
            }
        }

        let voxel_volume = metadata.spacing.voxel_volume();
        let shapes = acc
            .into_iter()
            .map(|(label, a)| {
                let bounding_box = BoundingBox::new(
                    a.min,
                    std::array::from_fn(|i| a.max[i] - a.min[i] + 1),
                );
                let mean = Point::new(std::array::from_fn(|i| a.sum[i] / a.count as f64));
                let shape = LabelShape {
                    label,
                    voxel_count: a.count,
                    bounding_box,
                    physical_size: a.count as f64 * voxel_volume,
                    physical_bounding_box: physical_extent(metadata, &a.min, &a.max),
                    centroid: metadata.index_to_physical(&mean),
                };
                (label, shape)
            })
            .collect();

        Self { shapes }
    }

    /// Present labels in ascending order.
    pub fn labels(&self) -> Vec<u32> {
        self.shapes.keys().copied().collect()
    }

    pub fn has_label(&self, label: u32) -> bool {
        self.shapes.contains_key(&label)
    }

    pub fn get(&self, label: u32) -> Option<&LabelShape> {
        self.shapes.get(&label)
    }

    pub fn bounding_box(&self, label: u32) -> Option<BoundingBox<3>> {
        self.get(label).map(|s| s.bounding_box)
    }

    pub fn physical_size(&self, label: u32) -> Option<f64> {
        self.get(label).map(|s| s.physical_size)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelShape> {
        self.shapes.values()
    }
}

fn physical_extent(metadata: &ImageMetadata<3>, min: &[usize; 3], max: &[usize; 3]) -> (Point<3>, Point<3>) {
    let mut lo = Point::new([f64::INFINITY; 3]);
    let mut hi = Point::new([f64::NEG_INFINITY; 3]);
    for corner in 0..8 {
        let index = Point::new(std::array::from_fn(|i| {
            if corner & (1 << i) == 0 { min[i] as f64 } else { max[i] as f64 }
        }));
        let p = metadata.index_to_physical(&index);
        for i in 0..3 {
            lo[i] = lo[i].min(p[i]);
            hi[i] = hi[i].max(p[i]);
        }
    }
    (lo, hi)
}
