//! Conjugate gradient on symmetric positive definite operators
//!
//! Used for the normal equations `(AᵀA + λI) x = Aᵀb` when forming `AᵀA`
//! explicitly is too expensive: the operator is applied matrix-free through
//! [`DampedNormalOperator`](crate::traits::DampedNormalOperator).

use crate::traits::LinearOperator;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Stopping rule and progress reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgConfig {
    pub max_iterations: usize,
    /// Target for `‖r‖ / ‖b‖`
    pub tolerance: f64,
    /// Log every N iterations (0 = silent)
    pub print_interval: usize,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            print_interval: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CgSolution {
    pub x: Array1<f64>,
    pub iterations: usize,
    /// `‖r‖ / ‖b‖` at exit
    pub residual: f64,
    pub converged: bool,
}

/// Solve `A x = b` starting from `x = 0`
///
/// Breaks down (returns `converged: false`) if `pᵀAp` vanishes, which only
/// happens for operators that are not positive definite.
pub fn cg<A: LinearOperator>(operator: &A, b: &Array1<f64>, config: &CgConfig) -> CgSolution {
    let n = b.len();
    let mut x = Array1::<f64>::zeros(n);

    let b_norm = b.dot(b).sqrt();
    if b_norm < 1e-300 {
        return CgSolution {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let mut r = b.clone();
    let mut p = r.clone();
    let mut rho = r.dot(&r);

    for iter in 0..config.max_iterations {
        let q = operator.apply(&p);

        let pq = p.dot(&q);
        if pq.abs() < 1e-300 {
            return CgSolution {
                x,
                iterations: iter,
                residual: r.dot(&r).sqrt() / b_norm,
                converged: false,
            };
        }

        let alpha = rho / pq;
        x.scaled_add(alpha, &p);
        r.scaled_add(-alpha, &q);

        let rho_new = r.dot(&r);
        let rel_residual = rho_new.sqrt() / b_norm;

        if config.print_interval > 0 && (iter + 1) % config.print_interval == 0 {
            log::info!(
                "CG iteration {}: relative residual = {:.6e}",
                iter + 1,
                rel_residual
            );
        }

        if rel_residual < config.tolerance {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: true,
            };
        }

        let beta = rho_new / rho;
        rho = rho_new;

        p *= beta;
        p += &r;
    }

    CgSolution {
        residual: r.dot(&r).sqrt() / b_norm,
        x,
        iterations: config.max_iterations,
        converged: false,
    }
}
