//! Inversion options
//!
//! Options are plain serde structs so a scenario file only needs to list the
//! fields it changes:
//!
//! ```json
//! { "lambda": 1e-3, "max_iterations": 20, "method": "born" }
//! ```

use crate::error::{InverseError, Result};
use crate::jacobian::JacobianConfig;
use crate::response::ResponseKind;
use math_magneto_solvers::{CgConfig, SolverType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Outer iteration scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InversionMethod {
    /// Jacobian rebuilt around every iterate
    #[default]
    GaussNewton,
    /// Jacobian built once around the starting model and reused
    Born,
}

/// Regularization weights, stopping rules and method selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseOptions {
    pub method: InversionMethod,
    pub response: ResponseKind,

    /// Base Tikhonov weight `λ`
    pub lambda: f64,
    /// Per-iteration factor applied to `λ` when auto adjustment is on
    pub lambda_decay: f64,
    pub min_lambda: f64,
    pub max_lambda: f64,
    pub auto_adjust_regularization: bool,
    /// Scale `λ` by the mean diagonal of `JᵀJ`
    pub relative_regularization: bool,
    pub use_first_order: bool,
    pub use_second_order: bool,
    /// `γ = λ_eff · second_order_multiplier`
    pub second_order_multiplier: f64,

    /// Stop when `Φ / Φ₀` drops to this value
    pub functional_threshold: f64,
    /// Absolute change of `Φ` between iterations below which the run stagnates
    pub relative_tolerance: f64,
    pub max_iterations: usize,
    /// Wall-clock budget in seconds, checked between iterations
    pub time_budget_secs: Option<f64>,

    /// Kernel for the update system `(JᵀJ + R) Δμ = Jᵀr`
    pub solver: SolverType,
    pub cg: CgConfig,
    pub jacobian: JacobianConfig,
}

impl Default for InverseOptions {
    fn default() -> Self {
        Self {
            method: InversionMethod::GaussNewton,
            response: ResponseKind::Magnitude,
            lambda: 1e-3,
            lambda_decay: 0.5,
            min_lambda: 1e-8,
            max_lambda: 1e3,
            auto_adjust_regularization: true,
            relative_regularization: false,
            use_first_order: true,
            use_second_order: false,
            second_order_multiplier: 1.0,
            functional_threshold: 1e-4,
            relative_tolerance: 1e-12,
            max_iterations: 10,
            time_budget_secs: None,
            solver: SolverType::Cholesky,
            cg: CgConfig::default(),
            jacobian: JacobianConfig::default(),
        }
    }
}

impl InverseOptions {
    /// Load options from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let options: InverseOptions = serde_json::from_str(&contents)?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject weights and limits that cannot drive a meaningful run
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(InverseError::InvalidOptions(msg));

        for (name, value) in [
            ("lambda", self.lambda),
            ("min_lambda", self.min_lambda),
            ("max_lambda", self.max_lambda),
            ("second_order_multiplier", self.second_order_multiplier),
            ("functional_threshold", self.functional_threshold),
            ("relative_tolerance", self.relative_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be finite and non-negative, got {value}"));
            }
        }
        if !(self.lambda_decay > 0.0 && self.lambda_decay <= 1.0) {
            return invalid(format!("lambda_decay must lie in (0, 1], got {}", self.lambda_decay));
        }
        if self.min_lambda > self.max_lambda {
            return invalid(format!(
                "min_lambda {} exceeds max_lambda {}",
                self.min_lambda, self.max_lambda
            ));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        if let Some(budget) = self.time_budget_secs {
            if !(budget.is_finite() && budget >= 0.0) {
                return invalid(format!("time_budget_secs must be non-negative, got {budget}"));
            }
        }
        self.jacobian.validate()
    }
}
