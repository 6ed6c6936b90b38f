//! Affine transform backed by a parameter tensor.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use crate::spatial::Point;
use super::affine::AffineTransform;
use super::trait_::Transform;

/// Affine transform whose `D * D + D` parameters are a single tensor.
///
/// On an autodiff backend gradients flow from the mapped points back to the
/// parameters, which is what the registration optimiser needs. Layout matches
/// [`AffineTransform::parameters`].
#[derive(Debug, Clone)]
pub struct ParametricAffineTransform<B: Backend, const D: usize> {
    parameters: Tensor<B, 1>,
    center: Tensor<B, 2>,
}

impl<B: Backend, const D: usize> ParametricAffineTransform<B, D> {
    pub fn new(parameters: Tensor<B, 1>, center: &Point<D>) -> Self {
        let device = parameters.device();
        let center: Vec<f32> = (0..D).map(|i| center[i] as f32).collect();
        let center = Tensor::<B, 1>::from_data(TensorData::new(center, Shape::new([D])), &device)
            .reshape([1, D]);
        Self { parameters, center }
    }

    /// Tensor copy of a fixed transform.
    pub fn from_affine(transform: &AffineTransform<D>, device: &B::Device) -> Self {
        let params: Vec<f32> = transform.parameters().iter().map(|&p| p as f32).collect();
        let parameters = Tensor::<B, 1>::from_data(
            TensorData::new(params, Shape::new([AffineTransform::<D>::num_parameters()])),
            device,
        );
        Self::new(parameters, transform.center())
    }

    pub fn parameters(&self) -> &Tensor<B, 1> {
        &self.parameters
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for ParametricAffineTransform<B, D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let matrix = self.parameters.clone().slice([0..D * D]).reshape([D, D]);
        let translation = self
            .parameters
            .clone()
            .slice([D * D..D * D + D])
            .reshape([1, D]);
        (points - self.center.clone()).matmul(matrix.transpose()) + self.center.clone() + translation
    }
}
