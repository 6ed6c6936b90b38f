//! Linear interpolation (bilinear in 2D, trilinear in 3D).

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};
use super::trait_::Interpolator;

/// Linear interpolator.
///
/// The weights are differentiable with respect to the indices, so the
/// sampled values can be used inside an autodiff graph.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        match D {
            3 => self.interpolate_3d(data, indices),
            2 => self.interpolate_2d(data, indices),
            _ => panic!("LinearInterpolator only supports 2D and 3D tensors"),
        }
    }
}

impl LinearInterpolator {
    fn interpolate_3d<B: Backend, const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims = data.dims();
        let (nz, ny, nx) = (dims[0], dims[1], dims[2]);

        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let z = indices.narrow(1, 2, 1).squeeze::<1>(1);

        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let z0 = z.clone().floor();

        let wx = x - x0.clone();
        let wy = y - y0.clone();
        let wz = z - z0.clone();

        let x1 = Self::clamp_index(x0.clone() + 1.0, nx);
        let y1 = Self::clamp_index(y0.clone() + 1.0, ny);
        let z1 = Self::clamp_index(z0.clone() + 1.0, nz);
        let x0 = Self::clamp_index(x0, nx);
        let y0 = Self::clamp_index(y0, ny);
        let z0 = Self::clamp_index(z0, nz);

        let stride_z = (ny * nx) as i32;
        let stride_y = nx as i32;
        let flat = data.clone().reshape([nz * ny * nx]);
        let gather = |xi: &Tensor<B, 1, Int>, yi: &Tensor<B, 1, Int>, zi: &Tensor<B, 1, Int>| {
            let idx = zi.clone() * stride_z + yi.clone() * stride_y + xi.clone();
            flat.clone().gather(0, idx)
        };

        let c00 = Self::lerp(gather(&x0, &y0, &z0), gather(&x1, &y0, &z0), wx.clone());
        let c10 = Self::lerp(gather(&x0, &y1, &z0), gather(&x1, &y1, &z0), wx.clone());
        let c01 = Self::lerp(gather(&x0, &y0, &z1), gather(&x1, &y0, &z1), wx.clone());
        let c11 = Self::lerp(gather(&x0, &y1, &z1), gather(&x1, &y1, &z1), wx);

        let c0 = Self::lerp(c00, c10, wy.clone());
        let c1 = Self::lerp(c01, c11, wy);
        Self::lerp(c0, c1, wz)
    }

    fn interpolate_2d<B: Backend, const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims = data.dims();
        let (ny, nx) = (dims[0], dims[1]);

        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.narrow(1, 1, 1).squeeze::<1>(1);

        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let wx = x - x0.clone();
        let wy = y - y0.clone();

        let x1 = Self::clamp_index(x0.clone() + 1.0, nx);
        let y1 = Self::clamp_index(y0.clone() + 1.0, ny);
        let x0 = Self::clamp_index(x0, nx);
        let y0 = Self::clamp_index(y0, ny);

        let stride_y = nx as i32;
        let flat = data.clone().reshape([ny * nx]);
        let gather = |xi: &Tensor<B, 1, Int>, yi: &Tensor<B, 1, Int>| {
            flat.clone().gather(0, yi.clone() * stride_y + xi.clone())
        };

        let c0 = Self::lerp(gather(&x0, &y0), gather(&x1, &y0), wx.clone());
        let c1 = Self::lerp(gather(&x0, &y1), gather(&x1, &y1), wx);
        Self::lerp(c0, c1, wy)
    }

    #[inline]
    fn clamp_index<B: Backend>(index: Tensor<B, 1>, len: usize) -> Tensor<B, 1, Int> {
        index.clamp(0.0, (len - 1) as f64).int()
    }

    #[inline]
    fn lerp<B: Backend>(a: Tensor<B, 1>, b: Tensor<B, 1>, w: Tensor<B, 1>) -> Tensor<B, 1> {
        a.clone() + (b - a) * w
    }
}
