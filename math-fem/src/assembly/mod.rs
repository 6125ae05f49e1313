//! Finite element matrix assembly
//!
//! Assembles the curl-curl stiffness matrix and the source load vector from
//! mesh, edge basis functions and current segments.

mod element;
mod global;

pub use element::*;
pub use global::*;
