//! Mesh types and generators for edge-element FEM
//!
//! This module provides the geometric primitives, the shared hexahedral mesh
//! geometry with per-cell permeability, and a structured grid generator.

mod generators;
mod geometry;
mod types;

pub use generators::*;
pub use geometry::*;
pub use types::*;
