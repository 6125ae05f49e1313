//! Forward model as seen by the inversion
//!
//! Bundles everything that stays fixed during a run (solver, sensors,
//! source segments, optional primary field, response kind) so the Jacobian
//! and the engine only pass a [`Mesh`] around.

use crate::error::{InverseError, Result};
use crate::response::ResponseKind;
use math_magneto_fem::{CurrentSegment, FieldSample, ForwardConfig, ForwardSolver, Mesh, Sensor};
use ndarray::Array1;

#[derive(Debug, Clone)]
pub struct ForwardModel {
    solver: ForwardSolver,
    sensors: Vec<Sensor>,
    segments: Vec<CurrentSegment>,
    primary: Option<Vec<FieldSample>>,
    response: ResponseKind,
}

impl ForwardModel {
    pub fn new(
        config: ForwardConfig,
        sensors: Vec<Sensor>,
        segments: Vec<CurrentSegment>,
        response: ResponseKind,
    ) -> Self {
        Self {
            solver: ForwardSolver::new(config),
            sensors,
            segments,
            primary: None,
            response,
        }
    }

    /// Subtract `primary` from every forward result
    pub fn with_primary(mut self, primary: Vec<FieldSample>) -> Result<Self> {
        if primary.len() != self.sensors.len() {
            return Err(InverseError::DimensionMismatch {
                context: "primary field",
                expected: self.sensors.len(),
                got: primary.len(),
            });
        }
        self.primary = Some(primary);
        Ok(self)
    }

    /// Use the total field of `background` as the primary field
    pub fn with_background(self, background: &Mesh) -> Result<Self> {
        let primary = self.solver.calculate(background, &self.sensors, &self.segments)?;
        self.with_primary(primary)
    }

    pub fn solver(&self) -> &ForwardSolver {
        &self.solver
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn segments(&self) -> &[CurrentSegment] {
        &self.segments
    }

    pub fn primary(&self) -> Option<&[FieldSample]> {
        self.primary.as_deref()
    }

    pub fn response_kind(&self) -> ResponseKind {
        self.response
    }

    pub fn data_len(&self) -> usize {
        self.response.data_len(self.sensors.len())
    }

    /// Copy whose forward solves stay on the calling thread
    pub fn sequential(&self) -> Self {
        Self {
            solver: ForwardSolver::new(self.solver.config().sequential()),
            ..self.clone()
        }
    }

    /// Field samples for `mesh` (secondary when a primary field is set)
    pub fn samples(&self, mesh: &Mesh) -> Result<Vec<FieldSample>> {
        let samples = match &self.primary {
            Some(primary) => {
                self.solver
                    .calculate_secondary(mesh, &self.sensors, &self.segments, primary)?
            }
            None => self.solver.calculate(mesh, &self.sensors, &self.segments)?,
        };
        Ok(samples)
    }

    /// Data vector for `mesh`
    pub fn response(&self, mesh: &Mesh) -> Result<Array1<f64>> {
        let samples = self.samples(mesh)?;
        self.observe(&samples)
    }

    /// Data vector of externally supplied samples (e.g. measurements)
    pub fn observe(&self, samples: &[FieldSample]) -> Result<Array1<f64>> {
        self.response.extract(samples, &self.sensors)
    }
}
