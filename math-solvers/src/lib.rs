//! Dense linear solvers for regularized FEM and inversion systems
//!
//! This crate provides the linear algebra kernels used by the magnetostatic
//! forward solver and by the Gauss-Newton inversion loop.
//!
//! # Features
//!
//! - **Direct Solvers**: LU with partial pivoting, Cholesky for SPD systems
//! - **Iterative Solvers**: Conjugate Gradient over any [`LinearOperator`]
//! - **Regularized Solve**: damped normal equations `(AᵀA + λI) x = Aᵀb`
//! - **Parallel helpers**: rayon-backed maps with sequential fallbacks
//!
//! # Example
//!
//! ```ignore
//! use math_magneto_solvers::{RegularizedConfig, solve_regularized};
//!
//! let config = RegularizedConfig::default();
//! let solution = solve_regularized(&matrix, &rhs, &config)?;
//! ```

pub mod direct;
pub mod iterative;
pub mod parallel;
pub mod regularized;
pub mod traits;

pub use traits::LinearOperator;

pub use direct::{
    CholeskyError, CholeskyFactorization, LuError, LuFactorization, cholesky_factorize,
    cholesky_solve, lu_factorize, lu_solve,
};
pub use iterative::{CgConfig, CgSolution, cg};
pub use regularized::{
    NormalEquations, RegularizedConfig, RegularizedSolution, SolveError, SolverType,
    solve_regularized, solve_spd,
};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
