//! Direction matrices describing image orientation.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Direction cosine matrix.
///
/// Column `i` is the physical direction of index axis `i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Identity orientation.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Build from a row-major slice of `D * D` values.
    pub fn from_row_slice(values: &[f64]) -> Self {
        assert!(values.len() == D * D, "Direction needs D*D values");
        Self(SMatrix::from_row_slice(values))
    }

    /// Check if direction matrix is orthogonal.
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        (product - SMatrix::<f64, D, D>::identity()).abs().max() < 1e-6
    }

    /// Determinant of the matrix.
    ///
    /// Cofactor expansion for D = 2, 3; partial-pivot elimination otherwise.
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        match D {
            1 => m[(0, 0)],
            2 => m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
            3 => {
                m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                    - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                    + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
            }
            _ => {
                let mut a = *m;
                let mut det = 1.0;
                for i in 0..D {
                    let pivot = (i..D)
                        .max_by(|&x, &y| a[(x, i)].abs().total_cmp(&a[(y, i)].abs()))
                        .unwrap_or(i);
                    if a[(pivot, i)] == 0.0 {
                        return 0.0;
                    }
                    if pivot != i {
                        a.swap_rows(pivot, i);
                        det = -det;
                    }
                    det *= a[(i, i)];
                    for k in (i + 1)..D {
                        let factor = a[(k, i)] / a[(i, i)];
                        for j in i..D {
                            a[(k, j)] -= factor * a[(i, j)];
                        }
                    }
                }
                det
            }
        }
    }

    /// Whether the matrix can be inverted numerically.
    pub fn is_invertible(&self) -> bool {
        self.determinant().abs() > 1e-12
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Transpose of the matrix.
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
