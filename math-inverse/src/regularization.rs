//! Tikhonov terms for the Gauss-Newton update
//!
//! First order adds `λI` and penalises the size of `Δμ`. Second order adds
//! `γL`, where `L` is the graph Laplacian of cell adjacency (cells sharing
//! an edge DOF), and penalises roughness between neighbours.

use crate::config::InverseOptions;
use ndarray::Array2;

/// `λ` used at `iteration`
///
/// With auto adjustment the weight decays geometrically towards
/// `min_lambda`; under stagnation it grows towards `max_lambda` instead.
pub fn effective_lambda(options: &InverseOptions, iteration: usize, stagnated: bool) -> f64 {
    if !options.auto_adjust_regularization {
        return options.lambda;
    }
    let factor = options.lambda_decay.powi(iteration as i32);
    if stagnated {
        (options.lambda / factor).min(options.max_lambda)
    } else {
        (options.lambda * factor).max(options.min_lambda)
    }
}

/// Graph Laplacian: `L[i][i] = deg(i)`, `L[i][j] = −1` for neighbours
pub fn graph_laplacian(adjacency: &[Vec<usize>]) -> Array2<f64> {
    let n = adjacency.len();
    let mut laplacian = Array2::zeros((n, n));
    for (i, neighbours) in adjacency.iter().enumerate() {
        laplacian[[i, i]] = neighbours.len() as f64;
        for &j in neighbours {
            laplacian[[i, j]] -= 1.0;
        }
    }
    laplacian
}

pub fn mean_diagonal(matrix: &Array2<f64>) -> f64 {
    let n = matrix.nrows().min(matrix.ncols());
    if n == 0 {
        return 0.0;
    }
    matrix.diag().sum() / n as f64
}

/// Weights actually applied to one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regularization {
    pub lambda: f64,
    /// Zero when the second-order term is inactive
    pub gamma: f64,
}

impl Regularization {
    /// Resolve the weights for this iteration
    ///
    /// `normal` is `JᵀJ`, only read when relative regularization is on.
    /// Stagnation switches the smoothing term on even if it is disabled.
    pub fn for_iteration(options: &InverseOptions, normal: &Array2<f64>, iteration: usize, stagnated: bool) -> Self {
        let mut lambda = effective_lambda(options, iteration, stagnated);
        if options.relative_regularization {
            let scale = mean_diagonal(normal);
            if scale > 0.0 {
                lambda *= scale;
            }
        }
        let gamma = if options.use_second_order || stagnated {
            lambda * options.second_order_multiplier
        } else {
            0.0
        };
        Self {
            lambda: if options.use_first_order { lambda } else { 0.0 },
            gamma,
        }
    }

    /// Add `λI + γL` to `normal` in place
    pub fn apply(&self, normal: &mut Array2<f64>, laplacian: &Array2<f64>) {
        if self.lambda != 0.0 {
            normal.diag_mut().mapv_inplace(|d| d + self.lambda);
        }
        if self.gamma != 0.0 {
            normal.scaled_add(self.gamma, laplacian);
        }
    }
}
