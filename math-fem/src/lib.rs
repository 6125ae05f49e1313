//! Edge-element FEM solver for 3-D magnetostatics
//!
//! This crate computes the magnetic field of prescribed line currents in a
//! heterogeneous, isotropic medium discretised on a structured hexahedral
//! mesh, using lowest-order edge (Nédélec) elements on the vector potential.
//!
//! # Features
//!
//! - **Structured meshes**: graded axis splittings, rectangular strata with their own μ
//! - **Edge elements**: 12 bilinear basis functions per brick, analytic or finite-difference curl
//! - **Parallel assembly**: per-DOF locking or ordered (deterministic) scatter
//! - **Regularized solve**: damped normal equations with Cholesky, LU or CG
//! - **Field sampling**: B (or H) at arbitrary sensors, primary/secondary split
//!
//! # Example
//!
//! ```ignore
//! use math_magneto_fem::{AxisSplitting, ForwardSolver, LineSource, StructuredMeshBuilder};
//!
//! let axis = AxisSplitting::uniform(-10.0, 10.0, 8);
//! let mesh = StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis).build()?;
//! let segments = LineSource::new(start, end, 1.0, 4).discretize()?;
//!
//! let solver = ForwardSolver::default();
//! let samples = solver.calculate(&mesh, &sensors, &segments)?;
//! ```

pub mod assembly;
pub mod basis;
pub mod boundary;
pub mod error;
pub mod mesh;
pub mod quadrature;
pub mod sensor;
pub mod solver;
pub mod source;

pub use assembly::{AssemblyOptions, AssemblyStrategy, GlobalSystem, assemble_system};
pub use basis::CurlScheme;
pub use error::{FemError, Result};
pub use mesh::{
    Aabb, Axis, AxisSplitting, Element, Mesh, MeshGeometry, Point3D, Stratum,
    StructuredMeshBuilder, Vector3D,
};
pub use quadrature::IntegrationRule;
pub use sensor::{FieldSample, Sensor, SensorComponent, plane_sensor_grid};
pub use solver::{ForwardConfig, ForwardSolution, ForwardSolver, PreparedSystem};
pub use source::{CurrentSegment, CurrentSource, LineSource, LoopSource, discretize_all};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
