//! Finite element basis functions
//!
//! Implements the lowest-order edge (Nédélec-type) vector basis on
//! axis-aligned hexahedra together with its curl.

mod edge;

pub use edge::*;
