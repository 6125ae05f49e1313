//! Boundary condition handling for edge-element problems
//!
//! The truncated domain is closed with homogeneous Dirichlet conditions on
//! the tangential field: every edge lying on the outer box is pinned to zero.

mod dirichlet;

pub use dirichlet::*;
