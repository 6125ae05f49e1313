//! Cholesky decomposition for symmetric positive definite systems
//!
//! The damped normal matrices `AᵀA + λI` produced by the forward and inverse
//! solvers are SPD, so this is the default factorization for both.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors that can occur during Cholesky factorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CholeskyError {
    #[error("Matrix is not positive definite (non-positive pivot {value} at row {row})")]
    NotPositiveDefinite { row: usize, value: f64 },
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Lower triangular factor `L` with `A = L Lᵀ`
#[derive(Debug, Clone)]
pub struct CholeskyFactorization {
    pub l: Array2<f64>,
    pub n: usize,
}

impl CholeskyFactorization {
    /// Solve Ax = b with two triangular sweeps
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>, CholeskyError> {
        if b.len() != self.n {
            return Err(CholeskyError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let n = self.n;
        let mut y = b.clone();

        // L y = b
        for i in 0..n {
            let mut sum = y[i];
            for k in 0..i {
                sum -= self.l[[i, k]] * y[k];
            }
            y[i] = sum / self.l[[i, i]];
        }

        // Lᵀ x = y
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n {
                sum -= self.l[[k, i]] * y[k];
            }
            y[i] = sum / self.l[[i, i]];
        }

        Ok(y)
    }
}

/// Factorize a symmetric positive definite matrix
///
/// Only the lower triangle of `a` is read.
pub fn cholesky_factorize(a: &Array2<f64>) -> Result<CholeskyFactorization, CholeskyError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(CholeskyError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(CholeskyError::NotPositiveDefinite { row: j, value: diag });
        }
        let l_jj = diag.sqrt();
        l[[j, j]] = l_jj;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / l_jj;
        }
    }

    Ok(CholeskyFactorization { l, n })
}

/// Solve an SPD system Ax = b
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, CholeskyError> {
    if b.len() != a.nrows() {
        return Err(CholeskyError::DimensionMismatch {
            expected: a.nrows(),
            got: b.len(),
        });
    }
    cholesky_factorize(a)?.solve(b)
}
