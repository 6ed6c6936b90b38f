//! Index grids for sampling whole images.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Continuous indices of every voxel of a `[Z, Y, X]`-shaped image.
///
/// Returns a `[N, 3]` tensor with columns (x, y, z) in raster order, x fastest.
pub fn generate_grid<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let total: usize = shape.iter().product();
    generate_grid_range(shape, 0, total, device)
}

/// Like [`generate_grid`] but only for flat voxel indices `start..end`.
///
/// Used to sample large images chunk by chunk.
pub fn generate_grid_range<B: Backend>(
    shape: [usize; 3],
    start: usize,
    end: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let [_, ny, nx] = shape;
    let count = end.saturating_sub(start);
    let mut grid = Vec::with_capacity(count * 3);
    for flat in start..end {
        let x = flat % nx;
        let y = (flat / nx) % ny;
        let z = flat / (nx * ny);
        grid.push(x as f32);
        grid.push(y as f32);
        grid.push(z as f32);
    }
    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([count * 3])), device)
        .reshape([count, 3])
}

/// Continuous indices for an explicit list of flat voxel positions.
pub fn grid_from_flat_indices<B: Backend>(
    shape: [usize; 3],
    flat_indices: &[usize],
    device: &B::Device,
) -> Tensor<B, 2> {
    let [_, ny, nx] = shape;
    let mut grid = Vec::with_capacity(flat_indices.len() * 3);
    for &flat in flat_indices {
        grid.push((flat % nx) as f32);
        grid.push(((flat / nx) % ny) as f32);
        grid.push((flat / (nx * ny)) as f32);
    }
    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([flat_indices.len() * 3])), device)
        .reshape([flat_indices.len(), 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_grid_raster_order() {
        let device = Default::default();
        let grid = generate_grid::<Backend>([2, 2, 3], &device);
        assert_eq!(grid.dims(), [12, 3]);
        let values: Vec<f32> = grid.into_data().to_vec().unwrap();
        assert_eq!(&values[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&values[3..6], &[1.0, 0.0, 0.0]);
        assert_eq!(&values[9..12], &[0.0, 1.0, 0.0]);
        assert_eq!(&values[33..36], &[2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_grid_range_matches_full_grid() {
        let device = Default::default();
        let full: Vec<f32> = generate_grid::<Backend>([3, 4, 5], &device).into_data().to_vec().unwrap();
        let part: Vec<f32> = generate_grid_range::<Backend>([3, 4, 5], 17, 29, &device)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(part.as_slice(), &full[17 * 3..29 * 3]);
    }

    #[test]
    fn test_grid_from_flat_indices() {
        let device = Default::default();
        let values: Vec<f32> = grid_from_flat_indices::<Backend>([2, 3, 4], &[0, 13], &device)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
    }
}
