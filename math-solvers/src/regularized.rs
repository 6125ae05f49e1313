//! Damped least-squares solves
//!
//! Both the forward operator and the Gauss-Newton update are solved through
//! the damped normal equations
//!
//! ```text
//! (AᵀA + λI) x = Aᵀb
//! ```
//!
//! which stay symmetric positive definite for any `λ > 0` even when `A`
//! itself is singular (the curl-curl operator has a large gradient kernel).

use crate::direct::{CholeskyError, LuError, cholesky_solve, lu_solve};
use crate::iterative::{CgConfig, cg};
use crate::traits::DampedNormalOperator;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Which kernel solves the normal system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// Cholesky on the explicit normal matrix, LU fallback if it is not SPD
    #[default]
    Cholesky,
    /// LU with partial pivoting on the explicit normal matrix
    Lu,
    /// Matrix-free conjugate gradient on `AᵀA + λI`
    ConjugateGradient,
}

/// Configuration of a damped least-squares solve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizedConfig {
    /// Diagonal shift `λ` added to `AᵀA`
    pub damping: f64,
    /// Kernel used for the normal system
    pub solver: SolverType,
    /// Settings for the CG kernel
    pub cg: CgConfig,
}

impl Default for RegularizedConfig {
    fn default() -> Self {
        Self {
            damping: 1e-2,
            solver: SolverType::Cholesky,
            cg: CgConfig::default(),
        }
    }
}

/// Errors from regularized solves
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("LU solve failed: {0}")]
    Lu(#[from] LuError),
    #[error("Cholesky solve failed: {0}")]
    Cholesky(#[from] CholeskyError),
    #[error("CG did not converge after {iterations} iterations (relative residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Explicit normal system `(AᵀA + λI, Aᵀb)`
#[derive(Debug, Clone)]
pub struct NormalEquations {
    pub matrix: Array2<f64>,
    pub rhs: Array1<f64>,
}

impl NormalEquations {
    /// Form `AᵀA + λI` and `Aᵀb`
    pub fn build(a: &Array2<f64>, b: &Array1<f64>, damping: f64) -> Result<Self, SolveError> {
        if a.nrows() != b.len() {
            return Err(SolveError::DimensionMismatch {
                expected: a.nrows(),
                got: b.len(),
            });
        }
        let mut matrix = a.t().dot(a);
        matrix.diag_mut().mapv_inplace(|d| d + damping);
        let rhs = a.t().dot(b);
        Ok(Self { matrix, rhs })
    }

    pub fn dim(&self) -> usize {
        self.rhs.len()
    }

    /// Add `value` to every diagonal entry
    pub fn shift_diagonal(&mut self, value: f64) {
        self.matrix.diag_mut().mapv_inplace(|d| d + value);
    }

    /// Solve the stored system
    pub fn solve(&self, solver: SolverType, cg_config: &CgConfig) -> Result<Array1<f64>, SolveError> {
        solve_spd(&self.matrix, &self.rhs, solver, cg_config)
    }
}

/// Result of a regularized solve
#[derive(Debug, Clone)]
pub struct RegularizedSolution {
    /// Solution vector
    pub x: Array1<f64>,
    /// `‖Ax − b‖₂` of the undamped system
    pub residual_norm: f64,
    /// Kernel that produced `x`
    pub solver: SolverType,
    /// CG iterations (0 for direct kernels)
    pub iterations: usize,
}

/// Solve a symmetric positive definite system with the chosen kernel
pub fn solve_spd(
    matrix: &Array2<f64>,
    rhs: &Array1<f64>,
    solver: SolverType,
    cg_config: &CgConfig,
) -> Result<Array1<f64>, SolveError> {
    if matrix.nrows() != rhs.len() {
        return Err(SolveError::DimensionMismatch {
            expected: matrix.nrows(),
            got: rhs.len(),
        });
    }
    match solver {
        SolverType::Cholesky => match cholesky_solve(matrix, rhs) {
            Ok(x) => Ok(x),
            Err(CholeskyError::NotPositiveDefinite { row, value }) => {
                log::warn!(
                    "Cholesky pivot {value:.3e} at row {row} is not positive, falling back to LU"
                );
                Ok(lu_solve(matrix, rhs)?)
            }
            Err(e) => Err(e.into()),
        },
        SolverType::Lu => Ok(lu_solve(matrix, rhs)?),
        SolverType::ConjugateGradient => {
            let solution = cg(matrix, rhs, cg_config);
            if solution.converged {
                Ok(solution.x)
            } else {
                Err(SolveError::NotConverged {
                    iterations: solution.iterations,
                    residual: solution.residual,
                })
            }
        }
    }
}

/// Solve `min ‖Ax − b‖² + λ‖x‖²` through the damped normal equations
pub fn solve_regularized(
    a: &Array2<f64>,
    b: &Array1<f64>,
    config: &RegularizedConfig,
) -> Result<RegularizedSolution, SolveError> {
    let start = Instant::now();

    let (x, iterations) = match config.solver {
        SolverType::ConjugateGradient => {
            if a.nrows() != b.len() {
                return Err(SolveError::DimensionMismatch {
                    expected: a.nrows(),
                    got: b.len(),
                });
            }
            let op = DampedNormalOperator::new(a, config.damping);
            let atb = a.t().dot(b);
            let solution = cg(&op, &atb, &config.cg);
            if !solution.converged {
                return Err(SolveError::NotConverged {
                    iterations: solution.iterations,
                    residual: solution.residual,
                });
            }
            (solution.x, solution.iterations)
        }
        direct => {
            let normal = NormalEquations::build(a, b, config.damping)?;
            (normal.solve(direct, &config.cg)?, 0)
        }
    };

    let residual = a.dot(&x) - b;
    let residual_norm = residual.dot(&residual).sqrt();

    log::debug!(
        "Regularized solve ({:?}, n={}, λ={:.1e}): residual {:.3e} in {:.1}ms",
        config.solver,
        x.len(),
        config.damping,
        residual_norm,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(RegularizedSolution {
        x,
        residual_norm,
        solver: config.solver,
        iterations,
    })
}
