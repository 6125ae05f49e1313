//! Factorised forward system for repeated source configurations

use super::{ForwardConfig, ForwardSolution, evaluate_sensors, locate_sensors, subtract_primary};
use crate::assembly::{assemble_load, assemble_stiffness};
use crate::boundary::{apply_dirichlet, apply_dirichlet_rhs, boundary_dofs};
use crate::error::{FemError, Result};
use crate::mesh::Mesh;
use crate::sensor::{FieldSample, Sensor};
use crate::source::CurrentSegment;
use math_magneto_solvers::{
    CholeskyError, CholeskyFactorization, LuFactorization, SolveError, SolverType, cg,
    cholesky_factorize, lu_factorize,
};
use ndarray::{Array1, Array2};
use std::time::Instant;

enum NormalFactor {
    Cholesky(CholeskyFactorization),
    Lu(LuFactorization),
    /// Explicit normal matrix for CG
    Matrix(Array2<f64>),
}

impl NormalFactor {
    fn factorize(normal: Array2<f64>, solver: SolverType) -> std::result::Result<Self, SolveError> {
        match solver {
            SolverType::Cholesky => match cholesky_factorize(&normal) {
                Ok(l) => Ok(Self::Cholesky(l)),
                Err(CholeskyError::NotPositiveDefinite { row, value }) => {
                    log::warn!(
                        "Normal matrix pivot {value:.3e} at row {row} is not positive, factorising with LU"
                    );
                    Ok(Self::Lu(lu_factorize(&normal)?))
                }
                Err(e) => Err(e.into()),
            },
            SolverType::Lu => Ok(Self::Lu(lu_factorize(&normal)?)),
            SolverType::ConjugateGradient => Ok(Self::Matrix(normal)),
        }
    }

    fn solve(&self, rhs: &Array1<f64>, config: &ForwardConfig) -> std::result::Result<(Array1<f64>, usize), SolveError> {
        match self {
            Self::Cholesky(l) => Ok((l.solve(rhs)?, 0)),
            Self::Lu(lu) => Ok((lu.solve(rhs)?, 0)),
            Self::Matrix(normal) => {
                let solution = cg(normal, rhs, &config.cg);
                if solution.converged {
                    Ok((solution.x, solution.iterations))
                } else {
                    Err(SolveError::NotConverged {
                        iterations: solution.iterations,
                        residual: solution.residual,
                    })
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Cholesky(_) => "cholesky",
            Self::Lu(_) => "lu",
            Self::Matrix(_) => "cg",
        }
    }
}

/// Forward system with the boundary-constrained stiffness and its damped
/// normal matrix factorised once
///
/// Valid only for the mesh and permeability it was built from; changing `μ`
/// requires a new [`PreparedSystem`].
pub struct PreparedSystem {
    mesh: Mesh,
    config: ForwardConfig,
    stiffness: Array2<f64>,
    boundary: Vec<usize>,
    factor: NormalFactor,
}

impl PreparedSystem {
    pub fn new(mesh: Mesh, config: ForwardConfig) -> Result<Self> {
        let start = Instant::now();
        let options = config.assembly_options();

        let mut stiffness = assemble_stiffness(&mesh, &options)?;
        let boundary = boundary_dofs(&mesh, config.boundary_eps);
        let mut scratch = Array1::zeros(mesh.dof_count());
        apply_dirichlet(&mut stiffness, &mut scratch, &boundary)?;

        let mut normal = stiffness.t().dot(&stiffness);
        normal.diag_mut().mapv_inplace(|d| d + config.damping);
        let factor = NormalFactor::factorize(normal, config.solver)?;

        log::info!(
            "Prepared forward system: {} DOFs ({} pinned), {} factor in {:.1}ms",
            mesh.dof_count(),
            boundary.len(),
            factor.name(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            mesh,
            config,
            stiffness,
            boundary,
            factor,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    pub fn dof_count(&self) -> usize {
        self.mesh.dof_count()
    }

    pub fn boundary_dofs(&self) -> &[usize] {
        &self.boundary
    }

    /// Solve for a new source configuration
    pub fn solve(&self, segments: &[CurrentSegment]) -> Result<ForwardSolution> {
        let mut rhs = assemble_load(&self.mesh, segments, &self.config.assembly_options())?;
        apply_dirichlet_rhs(&mut rhs, &self.boundary);

        let atb = self.stiffness.t().dot(&rhs);
        let (dofs, iterations) = self.factor.solve(&atb, &self.config)?;
        if dofs.iter().any(|v| !v.is_finite()) {
            return Err(FemError::NonFinite("prepared solve"));
        }

        let residual = self.stiffness.dot(&dofs) - &rhs;
        Ok(ForwardSolution {
            residual_norm: residual.dot(&residual).sqrt(),
            dofs,
            boundary: self.boundary.clone(),
            iterations,
        })
    }

    pub fn solve_dofs(&self, segments: &[CurrentSegment]) -> Result<Array1<f64>> {
        self.solve(segments).map(|s| s.dofs)
    }

    pub fn calculate(&self, sensors: &[Sensor], segments: &[CurrentSegment]) -> Result<Vec<FieldSample>> {
        locate_sensors(&self.mesh, sensors, self.config.containment_eps)?;
        let dofs = self.solve_dofs(segments)?;
        evaluate_sensors(&self.mesh, &dofs, sensors, &self.config.field_options())
    }

    pub fn calculate_secondary(
        &self,
        sensors: &[Sensor],
        segments: &[CurrentSegment],
        primary: &[FieldSample],
    ) -> Result<Vec<FieldSample>> {
        if primary.len() != sensors.len() {
            return Err(FemError::DimensionMismatch {
                context: "primary field",
                expected: sensors.len(),
                got: primary.len(),
            });
        }
        let total = self.calculate(sensors, segments)?;
        subtract_primary(&total, primary)
    }
}
