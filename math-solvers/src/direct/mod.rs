//! Direct solvers for linear systems
//!
//! This module provides direct (non-iterative) solvers:
//! - [`lu_solve`]: LU decomposition with partial pivoting
//! - [`cholesky_solve`]: Cholesky decomposition for SPD systems

mod cholesky;
mod lu;

pub use cholesky::{CholeskyError, CholeskyFactorization, cholesky_factorize, cholesky_solve};
pub use lu::{LuError, LuFactorization, lu_factorize, lu_solve};
