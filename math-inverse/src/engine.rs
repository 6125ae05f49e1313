//! Gauss-Newton / Born inversion loop
//!
//! Each outer iteration:
//!
//! 1. Forward-solve the current mesh and compute `Φ = Σ (d_obs − d)²`
//! 2. Stop on exact fit, on `Φ/Φ₀ ≤ threshold` or when the time budget is spent
//! 3. Flag stagnation when `|Φ_prev − Φ|` falls below the tolerance
//! 4. Take the Jacobian (rebuilt for Gauss-Newton, fixed for Born)
//! 5. Solve `(JᵀJ + λI + γL) Δμ = Jᵀr` and set `μ ← μ + Δμ`
//!
//! Progress is reported through [`IterationObserver`] instead of printing.

use crate::config::{InverseOptions, InversionMethod};
use crate::error::{InverseError, Result};
use crate::jacobian::JacobianBuilder;
use crate::model::ForwardModel;
use crate::regularization::{Regularization, graph_laplacian};
use crate::response::misfit;
use math_magneto_fem::{FieldSample, Mesh};
use math_magneto_solvers::solve_spd;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};

/// Functional treated as an exact fit
const EXACT_FIT: f64 = 1e-30;

/// Summary of one outer iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub functional: f64,
    /// `Φ / Φ₀`
    pub relative_functional: f64,
    /// Weights of the update taken this iteration (`None` if the loop stopped first)
    pub lambda: Option<f64>,
    pub gamma: Option<f64>,
    pub stagnated: bool,
    /// Largest `|Δμ_j|` applied
    pub max_update: Option<f64>,
    /// Wall-clock time since the run started
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverAction {
    Continue,
    Stop,
}

/// Receives every [`IterationRecord`] as it is produced
pub trait IterationObserver {
    fn on_iteration(&mut self, record: &IterationRecord) -> ObserverAction;
}

impl<F> IterationObserver for F
where
    F: FnMut(&IterationRecord) -> ObserverAction,
{
    fn on_iteration(&mut self, record: &IterationRecord) -> ObserverAction {
        self(record)
    }
}

/// Observer that writes one `info` line per iteration
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl IterationObserver for LogObserver {
    fn on_iteration(&mut self, record: &IterationRecord) -> ObserverAction {
        log::info!(
            "Iteration {}: Φ = {:.6e} (Φ/Φ₀ = {:.3e}), λ = {}, stagnated = {}, {:.1}s",
            record.iteration,
            record.functional,
            record.relative_functional,
            record
                .lambda
                .map_or_else(|| "-".to_string(), |l| format!("{l:.3e}")),
            record.stagnated,
            record.elapsed.as_secs_f64()
        );
        ObserverAction::Continue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ExactFit,
    ThresholdReached,
    TimeBudget,
    MaxIterations,
    StoppedByObserver,
}

/// Outcome of an inversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InversionReport {
    /// Recovered permeability per cell
    pub mu: Vec<f64>,
    pub records: Vec<IterationRecord>,
    pub stop_reason: StopReason,
    /// Model field of the final mesh
    pub final_field: Vec<FieldSample>,
    pub final_functional: f64,
}

impl InversionReport {
    pub fn initial_functional(&self) -> Option<f64> {
        self.records.first().map(|r| r.functional)
    }

    pub fn iterations(&self) -> usize {
        self.records.len()
    }
}

/// Drives the outer iterations for one set of options
#[derive(Debug)]
pub struct InversionEngine {
    options: InverseOptions,
    jacobian: JacobianBuilder,
}

impl InversionEngine {
    pub fn new(options: InverseOptions) -> Result<Self> {
        options.validate()?;
        let jacobian = JacobianBuilder::new(options.jacobian.clone())?;
        Ok(Self { options, jacobian })
    }

    pub fn options(&self) -> &InverseOptions {
        &self.options
    }

    pub fn jacobian_builder(&self) -> &JacobianBuilder {
        &self.jacobian
    }

    /// Invert with [`LogObserver`]
    pub fn invert(&self, model: &ForwardModel, observed: &Array1<f64>, mesh: &mut Mesh) -> Result<InversionReport> {
        self.invert_with_observer(model, observed, mesh, &mut LogObserver)
    }

    /// Fit `mesh`'s permeability to `observed`, updating it in place
    pub fn invert_with_observer(
        &self,
        model: &ForwardModel,
        observed: &Array1<f64>,
        mesh: &mut Mesh,
        observer: &mut dyn IterationObserver,
    ) -> Result<InversionReport> {
        if observed.is_empty() {
            return Err(InverseError::EmptyObservations);
        }
        if observed.len() != model.data_len() {
            return Err(InverseError::DimensionMismatch {
                context: "observed data",
                expected: model.data_len(),
                got: observed.len(),
            });
        }

        let options = &self.options;
        let start = Instant::now();
        let budget = options.time_budget_secs.map(Duration::from_secs_f64);
        let laplacian = graph_laplacian(&mesh.adjacency());

        log::info!(
            "Starting {:?} inversion: {} cells, {} data, {} Jacobian workers",
            options.method,
            mesh.num_elements(),
            observed.len(),
            self.jacobian.threads()
        );

        // Born keeps the sensitivities of the starting model
        let born_jacobian = match options.method {
            InversionMethod::Born => Some(self.jacobian.build_around(model, mesh)?.0),
            InversionMethod::GaussNewton => None,
        };

        let mut records = Vec::new();
        let mut initial_functional = None;
        let mut previous_functional: Option<f64> = None;
        let mut stop_reason = StopReason::MaxIterations;

        for iteration in 0..options.max_iterations {
            let model_values = model.response(mesh)?;
            let (residual, functional) = misfit(observed, &model_values)?;
            let phi0 = *initial_functional.get_or_insert(functional);
            let relative = if phi0 > 0.0 { functional / phi0 } else { 0.0 };
            let stagnated =
                previous_functional.is_some_and(|p| (p - functional).abs() < options.relative_tolerance);

            let mut record = IterationRecord {
                iteration,
                functional,
                relative_functional: relative,
                lambda: None,
                gamma: None,
                stagnated,
                max_update: None,
                elapsed: start.elapsed(),
            };

            let terminal = if functional <= EXACT_FIT {
                Some(StopReason::ExactFit)
            } else if relative <= options.functional_threshold {
                Some(StopReason::ThresholdReached)
            } else if budget.is_some_and(|b| start.elapsed() >= b) {
                log::warn!("Time budget exhausted after {} iterations", iteration);
                Some(StopReason::TimeBudget)
            } else {
                None
            };
            if let Some(reason) = terminal {
                observer.on_iteration(&record);
                records.push(record);
                stop_reason = reason;
                break;
            }
            if stagnated {
                log::warn!("Functional stagnated at iteration {iteration} (Φ = {functional:.6e})");
            }

            let jacobian = match &born_jacobian {
                Some(fixed) => Cow::Borrowed(fixed),
                None => Cow::Owned(self.jacobian.build(model, mesh, &model_values)?),
            };
            let (delta, weights) = self.update(&jacobian, &residual, &laplacian, iteration, stagnated)?;

            let updated: Vec<f64> = mesh
                .mu_values()
                .iter()
                .zip(delta.iter())
                .map(|(mu, d)| mu + d)
                .collect();
            mesh.set_mu_values(&updated)?;

            record.lambda = Some(weights.lambda);
            record.gamma = Some(weights.gamma);
            record.max_update = Some(delta.iter().fold(0.0_f64, |m, d| m.max(d.abs())));
            record.elapsed = start.elapsed();

            let action = observer.on_iteration(&record);
            records.push(record);
            previous_functional = Some(functional);

            if action == ObserverAction::Stop {
                stop_reason = StopReason::StoppedByObserver;
                break;
            }
        }

        let final_field = model.samples(mesh)?;
        let (_, final_functional) = misfit(observed, &model.observe(&final_field)?)?;

        log::info!(
            "Inversion finished ({:?}) after {} iterations: Φ {:.6e} -> {:.6e} in {:.1}s",
            stop_reason,
            records.len(),
            initial_functional.unwrap_or(final_functional),
            final_functional,
            start.elapsed().as_secs_f64()
        );

        Ok(InversionReport {
            mu: mesh.mu_values().to_vec(),
            records,
            stop_reason,
            final_field,
            final_functional,
        })
    }

    /// Regularized Gauss-Newton step `Δμ`
    fn update(
        &self,
        jacobian: &Array2<f64>,
        residual: &Array1<f64>,
        laplacian: &Array2<f64>,
        iteration: usize,
        stagnated: bool,
    ) -> Result<(Array1<f64>, Regularization)> {
        let mut normal = jacobian.t().dot(jacobian);
        let rhs = jacobian.t().dot(residual);

        let weights = Regularization::for_iteration(&self.options, &normal, iteration, stagnated);
        weights.apply(&mut normal, laplacian);

        let delta = solve_spd(&normal, &rhs, self.options.solver, &self.options.cg)?;
        if delta.iter().any(|v| !v.is_finite()) {
            return Err(InverseError::NonFinite("permeability update"));
        }
        log::debug!(
            "Update: λ = {:.3e}, γ = {:.3e}, |Δμ|∞ = {:.3e}",
            weights.lambda,
            weights.gamma,
            delta.iter().fold(0.0_f64, |m, d| m.max(d.abs()))
        );
        Ok((delta, weights))
    }
}
