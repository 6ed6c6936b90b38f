//! Point type for representing physical coordinates.

use nalgebra::Point as NaPoint;
use serde::{Deserialize, Serialize};
use super::Vector;

/// A position in D-dimensional physical space (usually millimetres).
///
/// Thin wrapper around nalgebra's `Point` so the rest of the crate can speak
/// in domain terms while still reaching the full nalgebra API via `inner()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// Create a point at the origin (all coordinates zero).
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Create a new point from a slice of coordinates.
    pub fn from_slice(coords: &[f64]) -> Self {
        assert!(coords.len() == D, "Coordinate slice length must match dimension");
        let mut point = Self::origin();
        for (i, c) in coords.iter().enumerate() {
            point.0.coords[i] = *c;
        }
        point
    }

    /// Convert point to a vector of coordinates.
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.coords.iter().copied().collect()
    }

    /// Coordinates as a fixed-size array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (o, c) in out.iter_mut().zip(self.0.coords.iter()) {
            *o = *c;
        }
        out
    }

    /// Position vector of this point (`self - origin`).
    pub fn coords(&self) -> Vector<D> {
        Vector(self.0.coords)
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.0 - other.0).norm()
    }

    /// Get the inner nalgebra point.
    pub fn inner(&self) -> &NaPoint<f64, D> {
        &self.0
    }

    /// Get mutable reference to inner nalgebra point.
    pub fn inner_mut(&mut self) -> &mut NaPoint<f64, D> {
        &mut self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}

impl<const D: usize> std::ops::Sub<Vector<D>> for Point<D> {
    type Output = Self;

    fn sub(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 - vector.0)
    }
}
