//! Dense LU factorization with partial pivoting
//!
//! Fallback kernel for normal matrices that fail the Cholesky test and the
//! explicit `Lu` solver choice. With the `ndarray-linalg` feature the one-shot
//! [`lu_solve`] goes through LAPACK instead.

use ndarray::{Array1, Array2, Zip, s};
use thiserror::Error;

#[cfg(feature = "ndarray-linalg")]
use ndarray_linalg::Solve;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuError {
    #[error("matrix is numerically singular (pivot vanished in column {column})")]
    SingularMatrix { column: usize },
    #[error("matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// `PA = LU` packed in one matrix
///
/// `L` (unit diagonal) sits strictly below the diagonal of `lu`, `U` on and
/// above it. Row `i` of `PA` is row `pivots[i]` of `A`.
#[derive(Debug, Clone)]
pub struct LuFactorization {
    pub lu: Array2<f64>,
    pub pivots: Vec<usize>,
    pub n: usize,
}

impl LuFactorization {
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x: Array1<f64> = self.pivots.iter().map(|&p| b[p]).collect();

        for i in 1..self.n {
            let dot = self.lu.slice(s![i, ..i]).dot(&x.slice(s![..i]));
            x[i] -= dot;
        }
        for i in (0..self.n).rev() {
            let dot = self.lu.slice(s![i, i + 1..]).dot(&x.slice(s![i + 1..]));
            x[i] = (x[i] - dot) / self.lu[[i, i]];
        }
        Ok(x)
    }
}

/// Factorise a square matrix
///
/// A pivot smaller than `n · ε · max|A|` is reported as singular.
pub fn lu_factorize(a: &Array2<f64>) -> Result<LuFactorization, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let tolerance = (n as f64) * f64::EPSILON * scale;

    let mut lu = a.clone();
    let mut pivots: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let (offset, magnitude) = lu
            .slice(s![k.., k])
            .iter()
            .map(|v| v.abs())
            .enumerate()
            .fold((0, -1.0), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        let pivot_row = k + offset;

        if !magnitude.is_finite() || magnitude <= tolerance || magnitude == 0.0 {
            return Err(LuError::SingularMatrix { column: k });
        }

        if pivot_row != k {
            let (mut upper, mut lower) = lu.multi_slice_mut((s![k, ..], s![pivot_row, ..]));
            Zip::from(&mut upper).and(&mut lower).for_each(std::mem::swap);
            pivots.swap(k, pivot_row);
        }

        let pivot = lu[[k, k]];
        let tail = lu.slice(s![k, k + 1..]).to_owned();
        for i in k + 1..n {
            let factor = lu[[i, k]] / pivot;
            lu[[i, k]] = factor;
            if factor != 0.0 {
                lu.slice_mut(s![i, k + 1..]).scaled_add(-factor, &tail);
            }
        }
    }

    Ok(LuFactorization { lu, pivots, n })
}

/// Factorise and solve in one call
pub fn lu_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, LuError> {
    if b.len() != a.nrows() {
        return Err(LuError::DimensionMismatch {
            expected: a.nrows(),
            got: b.len(),
        });
    }

    #[cfg(feature = "ndarray-linalg")]
    {
        a.solve_into(b.clone())
            .map_err(|_| LuError::SingularMatrix { column: 0 })
    }

    #[cfg(not(feature = "ndarray-linalg"))]
    {
        lu_factorize(a)?.solve(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_solves(a: &Array2<f64>, x: &Array1<f64>, b: &Array1<f64>) {
        let r = a.dot(x) - b;
        assert_abs_diff_eq!(r.dot(&r).sqrt(), 0.0, epsilon = 1e-11);
    }

    #[test]
    fn test_symmetric_indefinite() {
        // Symmetric but not positive definite: the case Cholesky hands over
        let a = array![[1.0, 2.0, 0.0], [2.0, 1.0, 1.0], [0.0, 1.0, -3.0]];
        let b = array![1.0, 0.0, -1.0];
        let x = lu_solve(&a, &b).unwrap();
        assert_solves(&a, &x, &b);
    }

    #[test]
    fn test_zero_leading_pivot() {
        let a = array![[0.0, 1.0, 2.0], [2.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
        let lu = lu_factorize(&a).unwrap();
        assert_ne!(lu.pivots[0], 0);
        let b = array![5.0, 4.0, 3.0];
        assert_solves(&a, &lu.solve(&b).unwrap(), &b);
    }

    #[test]
    fn test_factor_reuse_for_several_loads() {
        let a = Array2::from_shape_fn((6, 6), |(i, j)| {
            if i == j { 4.0 } else { 1.0 / (1.0 + (i as f64 - j as f64).abs()) }
        });
        let lu = lu_factorize(&a).unwrap();
        for shift in 0..3 {
            let b = Array1::from_shape_fn(6, |i| ((i + shift) as f64).cos());
            assert_solves(&a, &lu.solve(&b).unwrap(), &b);
        }
    }

    #[test]
    fn test_rank_deficient_is_singular() {
        let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [1.0, 0.0, 1.0]];
        assert!(matches!(lu_factorize(&a), Err(LuError::SingularMatrix { .. })));
    }

    #[test]
    fn test_shape_errors() {
        let a = Array2::<f64>::eye(2);
        assert_eq!(
            lu_solve(&a, &array![1.0, 2.0, 3.0]),
            Err(LuError::DimensionMismatch { expected: 2, got: 3 })
        );
        assert!(lu_factorize(&Array2::zeros((2, 3))).is_err());
        let lu = lu_factorize(&a).unwrap();
        assert!(lu.solve(&array![1.0]).is_err());
    }
}
