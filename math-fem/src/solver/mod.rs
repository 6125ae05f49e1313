//! Magnetostatic forward solver
//!
//! A forward solve turns a mesh with per-element permeability and a set of
//! current segments into magnetic field samples:
//!
//! 1. Assemble the curl-curl stiffness matrix and source load
//! 2. Pin every boundary edge (`q = 0`)
//! 3. Solve the damped normal equations `(AᵀA + λI) q = Aᵀb`
//! 4. Reconstruct `B = ∇ × A` at each sensor
//!
//! The damping keeps the system solvable even though the curl-curl operator
//! has a gradient null space.
//!
//! # Solver Types
//!
//! - **Cholesky**: explicit normal matrix, LU fallback when not SPD (default)
//! - **Lu**: explicit normal matrix with partial pivoting
//! - **ConjugateGradient**: matrix-free on `AᵀA + λI`
//!
//! [`PreparedSystem`] factorises the normal matrix once for a fixed mesh and
//! permeability so that several source configurations can reuse it.

mod field;
mod prepared;

pub use field::*;
pub use prepared::*;

use crate::assembly::{AssemblyOptions, AssemblyStrategy, GlobalSystem, assemble_system};
use crate::basis::CurlScheme;
use crate::boundary::apply_homogeneous_dirichlet;
use crate::error::Result;
use crate::mesh::Mesh;
use crate::quadrature::IntegrationRule;
use crate::sensor::{FieldSample, Sensor};
use crate::source::CurrentSegment;
use math_magneto_solvers::{CgConfig, RegularizedConfig, SolverType, solve_regularized};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Forward solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Tikhonov shift `λ` of the normal equations
    pub damping: f64,
    /// Kernel for the normal system
    pub solver: SolverType,
    /// CG settings (used when `solver` is `conjugate_gradient`)
    pub cg: CgConfig,
    /// Tolerance for detecting edges on the domain boundary
    pub boundary_eps: f64,
    /// Tolerance for point-in-element tests (sources and sensors)
    pub containment_eps: f64,
    pub integration: IntegrationRule,
    pub curl_scheme: CurlScheme,
    pub assembly: AssemblyStrategy,
    /// Report `H = B / μ` instead of `B`
    pub normalize_by_mu: bool,
    /// Use the rayon pool for assembly and sensor evaluation
    pub parallel: bool,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            damping: 1e-2,
            solver: SolverType::Cholesky,
            cg: CgConfig::default(),
            boundary_eps: 1e-8,
            containment_eps: 1e-8,
            integration: IntegrationRule::default(),
            curl_scheme: CurlScheme::default(),
            assembly: AssemblyStrategy::default(),
            normalize_by_mu: false,
            parallel: true,
        }
    }
}

impl ForwardConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            rule: self.integration,
            curl_scheme: self.curl_scheme,
            strategy: self.assembly,
            containment_eps: self.containment_eps,
            parallel: self.parallel,
        }
    }

    pub fn field_options(&self) -> FieldOptions {
        FieldOptions {
            curl_scheme: self.curl_scheme,
            containment_eps: self.containment_eps,
            normalize_by_mu: self.normalize_by_mu,
            parallel: self.parallel,
        }
    }

    pub fn regularized(&self) -> RegularizedConfig {
        RegularizedConfig {
            damping: self.damping,
            solver: self.solver,
            cg: self.cg.clone(),
        }
    }

    /// Same settings with all internal parallelism disabled
    pub fn sequential(&self) -> Self {
        Self {
            parallel: false,
            ..self.clone()
        }
    }
}

/// Solution of one forward solve
#[derive(Debug, Clone)]
pub struct ForwardSolution {
    /// Edge DOFs `q`
    pub dofs: Array1<f64>,
    /// Boundary DOFs that were pinned
    pub boundary: Vec<usize>,
    /// `‖Aq − b‖₂` of the constrained (undamped) system
    pub residual_norm: f64,
    /// CG iterations (0 for direct kernels)
    pub iterations: usize,
}

/// Edge-element magnetostatic solver
#[derive(Debug, Clone, Default)]
pub struct ForwardSolver {
    config: ForwardConfig,
}

impl ForwardSolver {
    pub fn new(config: ForwardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    /// Assembled system with boundary conditions applied
    pub fn assemble(&self, mesh: &Mesh, segments: &[CurrentSegment]) -> Result<(GlobalSystem, Vec<usize>)> {
        let mut system = assemble_system(mesh, segments, &self.config.assembly_options())?;
        let boundary = apply_homogeneous_dirichlet(&mut system, mesh, self.config.boundary_eps)?;
        Ok((system, boundary))
    }

    /// Full solve returning the DOFs and solver statistics
    pub fn solve(&self, mesh: &Mesh, segments: &[CurrentSegment]) -> Result<ForwardSolution> {
        let start = Instant::now();
        let (system, boundary) = self.assemble(mesh, segments)?;
        let solution = solve_regularized(&system.matrix, &system.rhs, &self.config.regularized())?;

        log::debug!(
            "Forward solve: {} DOFs ({} pinned), {} segments, residual {:.3e} in {:.1}ms",
            system.dim(),
            boundary.len(),
            segments.len(),
            solution.residual_norm,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(ForwardSolution {
            dofs: solution.x,
            boundary,
            residual_norm: solution.residual_norm,
            iterations: solution.iterations,
        })
    }

    /// Edge DOFs for `segments`
    pub fn solve_dofs(&self, mesh: &Mesh, segments: &[CurrentSegment]) -> Result<Array1<f64>> {
        self.solve(mesh, segments).map(|s| s.dofs)
    }

    /// Field at `sensors` for given DOFs
    pub fn evaluate(&self, mesh: &Mesh, dofs: &Array1<f64>, sensors: &[Sensor]) -> Result<Vec<FieldSample>> {
        evaluate_sensors(mesh, dofs, sensors, &self.config.field_options())
    }

    /// Total field at `sensors`
    pub fn calculate(
        &self,
        mesh: &Mesh,
        sensors: &[Sensor],
        segments: &[CurrentSegment],
    ) -> Result<Vec<FieldSample>> {
        // Fail on misplaced sensors before paying for the solve
        locate_sensors(mesh, sensors, self.config.containment_eps)?;
        let dofs = self.solve_dofs(mesh, segments)?;
        self.evaluate(mesh, &dofs, sensors)
    }

    /// Secondary field: total field minus a precomputed `primary`
    pub fn calculate_secondary(
        &self,
        mesh: &Mesh,
        sensors: &[Sensor],
        segments: &[CurrentSegment],
        primary: &[FieldSample],
    ) -> Result<Vec<FieldSample>> {
        if primary.len() != sensors.len() {
            return Err(crate::error::FemError::DimensionMismatch {
                context: "primary field",
                expected: sensors.len(),
                got: primary.len(),
            });
        }
        let total = self.calculate(mesh, sensors, segments)?;
        subtract_primary(&total, primary)
    }

    /// Factorise the system of `mesh` for repeated solves
    pub fn prepare(&self, mesh: &Mesh) -> Result<PreparedSystem> {
        PreparedSystem::new(mesh.clone(), self.config.clone())
    }
}
