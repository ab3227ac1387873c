//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the convergence criteria and damping settings used by
//! [`LevenbergMarquardt`](super::LevenbergMarquardt).

use serde::{Deserialize, Serialize};

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of trial steps. Default: 1000
    pub max_iterations: usize,

    /// Tolerance for the relative reduction in the sum of squares. Default: 1e-8
    pub ftol: f64,

    /// Tolerance for the relative change of each parameter over an accepted
    /// step. Default: 1e-8
    pub xtol: f64,

    /// Tolerance for the largest cosine between the residuals and a Jacobian
    /// column. Default: 1e-8
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e12
    pub max_lambda: f64,

    /// Relative step for the finite-difference Jacobian.
    /// Default: None (square root of machine epsilon)
    pub diff_step: Option<f64>,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            diff_step: None,
        }
    }
}
