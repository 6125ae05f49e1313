//! Error type for mesh construction, assembly and forward solves

use crate::mesh::Point3D;
use math_magneto_solvers::SolveError;
use thiserror::Error;

/// Errors raised by the FEM crate
#[derive(Debug, Error)]
pub enum FemError {
    #[error("local edge number {0} is out of range (expected 0..12)")]
    LocalEdgeOutOfRange(usize),
    #[error("element {element} has degenerate volume {volume:e}")]
    DegenerateElement { element: usize, volume: f64 },
    #[error("degenerate bounding box with extents {extent:?}")]
    DegenerateBounds { extent: [f64; 3] },
    #[error("{kind} index {got} found where {expected} was expected (indices must be dense)")]
    NonDenseIndex {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("edge {edge} references node {node} but the mesh has {count} nodes")]
    NodeOutOfRange {
        edge: usize,
        node: usize,
        count: usize,
    },
    #[error("element {element} references edge {edge} but the mesh has {count} edges")]
    EdgeOutOfRange {
        element: usize,
        edge: usize,
        count: usize,
    },
    #[error("edge {0} is not a non-zero axis-aligned segment")]
    MalformedEdge(usize),
    #[error("element {element}: local edge {local} does not match the canonical hexahedron layout")]
    NonCanonicalElement { element: usize, local: usize },
    #[error("edge {0} is not used by any element")]
    UnusedEdge(usize),
    #[error("element {index} out of range for a mesh with {count} elements")]
    ElementOutOfRange { index: usize, count: usize },
    #[error("element {element} has invalid permeability {mu}")]
    InvalidPermeability { element: usize, mu: f64 },
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("sensor {index} at {position} is not inside any element")]
    SensorOutsideMesh { index: usize, position: Point3D },
    #[error("invalid current source: {0}")]
    InvalidSource(String),
    #[error("invalid mesh parameters: {0}")]
    InvalidMeshParameters(String),
    #[error("non-finite value produced by {0}")]
    NonFinite(&'static str),
    #[error("linear solve failed: {0}")]
    Solve(#[from] SolveError),
    #[error("failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FemError>;
