//! Nearest-neighbour interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use super::trait_::Interpolator;

/// Picks the voxel whose centre is closest. Never mixes values, so label
/// maps stay a subset of their original labels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims = data.dims();
        let total: usize = dims.iter().product();
        let flat = data.clone().reshape([total]);
        match D {
            3 => {
                let (nz, ny, nx) = (dims[0], dims[1], dims[2]);
                let x = Self::nearest(indices.clone().narrow(1, 0, 1).squeeze::<1>(1), nx);
                let y = Self::nearest(indices.clone().narrow(1, 1, 1).squeeze::<1>(1), ny);
                let z = Self::nearest(indices.narrow(1, 2, 1).squeeze::<1>(1), nz);
                let idx = z * ((ny * nx) as i32) + y * (nx as i32) + x;
                flat.gather(0, idx)
            }
            2 => {
                let (ny, nx) = (dims[0], dims[1]);
                let x = Self::nearest(indices.clone().narrow(1, 0, 1).squeeze::<1>(1), nx);
                let y = Self::nearest(indices.narrow(1, 1, 1).squeeze::<1>(1), ny);
                flat.gather(0, y * (nx as i32) + x)
            }
            _ => panic!("NearestNeighborInterpolator only supports 2D and 3D tensors"),
        }
    }
}

impl NearestNeighborInterpolator {
    // floor(i + 0.5) so that halves round up consistently
    fn nearest<B: Backend>(index: Tensor<B, 1>, len: usize) -> Tensor<B, 1, burn::tensor::Int> {
        (index + 0.5).floor().clamp(0.0, (len - 1) as f64).int()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_3d() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], &device)
            .reshape([2, 2, 2]);
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.6, 0.4, 0.0], [0.5, 0.5, 0.5], [-3.0, 9.0, 1.2]], &device);
        let values: Vec<f32> = NearestNeighborInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(values, vec![1.0, 7.0, 6.0]);
    }

    #[test]
    fn test_nearest_2d() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0], [3.0, 4.0]], &device);
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.2, 0.9]], &device);
        let values: Vec<f32> = NearestNeighborInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(values, vec![3.0]);
    }
}
