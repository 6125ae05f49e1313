//! Numerical quadrature rules for element integration
//!
//! Both rules use eight points of weight `V / 8`; they differ only in where
//! the points sit inside the hexahedron.

mod rules;

pub use rules::*;
