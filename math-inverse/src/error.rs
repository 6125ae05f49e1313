//! Error type for inversion

use math_magneto_fem::FemError;
use math_magneto_solvers::SolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InverseError {
    #[error("forward solve failed: {0}")]
    Forward(#[from] FemError),
    #[error("update solve failed: {0}")]
    Update(#[from] SolveError),
    #[error("{context}: expected length {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid inversion options: {0}")]
    InvalidOptions(String),
    #[error("no observations to invert")]
    EmptyObservations,
    #[error("non-finite values in {0}")]
    NonFinite(&'static str),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InverseError>;
