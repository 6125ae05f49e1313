//! Core traits for linear algebra operations
//!
//! This module defines the abstraction shared by the iterative solvers:
//! - [`LinearOperator`]: Trait for matrix-like objects that can perform matrix-vector products
//!
//! Dense `Array2<f64>` matrices implement it directly, and [`DampedNormalOperator`]
//! applies `AᵀA + λI` without ever forming the normal matrix.

use ndarray::{Array1, Array2};

/// Trait for linear operators (matrices or matrix-free representations)
///
/// Implementors only need to provide matrix-vector products, which is all a
/// Krylov method requires.
pub trait LinearOperator: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Apply the transpose: y = A^T * x
    fn apply_transpose(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

impl LinearOperator for Array2<f64> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_cols(&self) -> usize {
        self.ncols()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.dot(x)
    }

    fn apply_transpose(&self, x: &Array1<f64>) -> Array1<f64> {
        self.t().dot(x)
    }
}

/// Matrix-free damped normal operator `x ↦ Aᵀ(A x) + λ x`
///
/// Symmetric positive definite for any `A` as long as `λ > 0`.
pub struct DampedNormalOperator<'a, A: LinearOperator> {
    inner: &'a A,
    damping: f64,
}

impl<'a, A: LinearOperator> DampedNormalOperator<'a, A> {
    pub fn new(inner: &'a A, damping: f64) -> Self {
        Self { inner, damping }
    }
}

impl<A: LinearOperator> LinearOperator for DampedNormalOperator<'_, A> {
    fn num_rows(&self) -> usize {
        self.inner.num_cols()
    }

    fn num_cols(&self) -> usize {
        self.inner.num_cols()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        let ax = self.inner.apply(x);
        let mut y = self.inner.apply_transpose(&ax);
        y.scaled_add(self.damping, x);
        y
    }

    fn apply_transpose(&self, x: &Array1<f64>) -> Array1<f64> {
        self.apply(x)
    }
}
