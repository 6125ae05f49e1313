//! Iterative solvers for linear systems
//!
//! - [`cg`]: Conjugate Gradient for symmetric positive definite operators
//!
//! Used as the matrix-free path for damped normal equations when the dense
//! factorization would be too large to hold.

mod cg;

pub use cg::{CgConfig, CgSolution, cg};
