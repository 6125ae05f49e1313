//! Permeability inversion for magnetostatic sounding
//!
//! Recovers a per-cell permeability field from magnetic field measurements
//! by repeatedly linearising the edge-element forward model of
//! `math-magneto-fem`.
//!
//! # Features
//!
//! - **Gauss-Newton**: Jacobian rebuilt around every iterate
//! - **Born**: Jacobian fixed around the starting model
//! - **Tikhonov regularization**: damping (first order) and adjacency Laplacian smoothing (second order)
//! - **Adaptive weights**: geometric λ decay, increased under stagnation
//! - **Parallel Jacobian**: one forward solve per cell on a bounded rayon pool
//!
//! # Example
//!
//! ```ignore
//! use math_magneto_inverse::{ForwardModel, InverseOptions, InversionEngine};
//!
//! let model = ForwardModel::new(config, sensors, segments, options.response)
//!     .with_background(&mesh)?;
//! let observed = model.observe(&measured)?;
//! let engine = InversionEngine::new(options)?;
//! let report = engine.invert(&model, &observed, &mut mesh)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod jacobian;
pub mod model;
pub mod regularization;
pub mod response;
pub mod scenario;

pub use config::{InverseOptions, InversionMethod};
pub use engine::{
    InversionEngine, InversionReport, IterationObserver, IterationRecord, LogObserver,
    ObserverAction, StopReason,
};
pub use error::{InverseError, Result};
pub use jacobian::{JacobianBuilder, JacobianConfig};
pub use model::ForwardModel;
pub use regularization::{Regularization, effective_lambda, graph_laplacian};
pub use response::{ResponseKind, misfit};
pub use scenario::{Scenario, SensorGrid};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
