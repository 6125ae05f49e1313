//! Finite-difference sensitivities of the model response to cell permeability
//!
//! Column `j` of the Jacobian is
//!
//! ```text
//! J[:, j] = (d(μ + δ_j e_j) − d(μ)) / δ_j,   δ_j = h · max(floor, |μ_j|)
//! ```
//!
//! Columns are independent forward solves. They run on a dedicated rayon
//! pool whose size bounds the number of concurrent solves; each task owns a
//! perturbed copy of the mesh (only the μ array is copied, geometry is
//! shared) and runs its forward solve sequentially.

use crate::error::{InverseError, Result};
use crate::model::ForwardModel;
use math_magneto_fem::Mesh;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Perturbation and worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JacobianConfig {
    /// Relative perturbation `h`
    pub relative_step: f64,
    /// Lower bound for `|μ_j|` in the step so zero cells still move
    pub step_floor: f64,
    /// Worker count (default: available parallelism)
    pub threads: Option<usize>,
}

impl Default for JacobianConfig {
    fn default() -> Self {
        Self {
            relative_step: 0.1,
            step_floor: 1e-8,
            threads: None,
        }
    }
}

impl JacobianConfig {
    pub fn step(&self, mu: f64) -> f64 {
        self.relative_step * self.step_floor.max(mu.abs())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.relative_step.is_finite() && self.relative_step > 0.0) {
            return Err(InverseError::InvalidOptions(format!(
                "jacobian relative_step must be positive, got {}",
                self.relative_step
            )));
        }
        if !(self.step_floor.is_finite() && self.step_floor > 0.0) {
            return Err(InverseError::InvalidOptions(format!(
                "jacobian step_floor must be positive, got {}",
                self.step_floor
            )));
        }
        if self.threads == Some(0) {
            return Err(InverseError::InvalidOptions(
                "jacobian threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Builds Jacobians on its own bounded worker pool
pub struct JacobianBuilder {
    config: JacobianConfig,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for JacobianBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JacobianBuilder")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl JacobianBuilder {
    pub fn new(config: JacobianConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|i| format!("jacobian-{i}"))
            .build()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &JacobianConfig {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Jacobian around `mesh` with precomputed base response `base`
    pub fn build(&self, model: &ForwardModel, mesh: &Mesh, base: &Array1<f64>) -> Result<Array2<f64>> {
        let rows = model.data_len();
        if base.len() != rows {
            return Err(InverseError::DimensionMismatch {
                context: "jacobian base response",
                expected: rows,
                got: base.len(),
            });
        }

        let start = Instant::now();
        let cells = mesh.num_elements();
        let local = model.sequential();
        let done = AtomicUsize::new(0);

        let columns: Vec<Array1<f64>> = self.pool.install(|| {
            (0..cells)
                .into_par_iter()
                .map(|j| {
                    let column = self.column(&local, mesh, base, j);
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    log::trace!("Jacobian column {j} done ({finished}/{cells})");
                    column
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut jacobian = Array2::zeros((rows, cells));
        for (j, column) in columns.iter().enumerate() {
            jacobian.column_mut(j).assign(column);
        }

        log::debug!(
            "Jacobian {}x{} on {} workers in {:.1}ms",
            rows,
            cells,
            self.threads(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(jacobian)
    }

    /// Compute the base response first, then the Jacobian around it
    pub fn build_around(&self, model: &ForwardModel, mesh: &Mesh) -> Result<(Array2<f64>, Array1<f64>)> {
        let base = model.response(mesh)?;
        let jacobian = self.build(model, mesh, &base)?;
        Ok((jacobian, base))
    }

    fn column(&self, model: &ForwardModel, mesh: &Mesh, base: &Array1<f64>, j: usize) -> Result<Array1<f64>> {
        let delta = self.config.step(mesh.mu(j)?);
        let perturbed = mesh.with_perturbed_mu(j, delta)?;
        let values = model.response(&perturbed)?;
        let column = (values - base) / delta;
        if column.iter().any(|v| !v.is_finite()) {
            return Err(InverseError::NonFinite("jacobian column"));
        }
        Ok(column)
    }
}
