//! # Uncertainty Calculations
//!
//! Covariance and standard errors derived from the Jacobian at the solution,
//! and the Student-t quantile quoted in fit reports.

pub mod covariance;
pub mod distribution;

pub use covariance::{calculate_correlation, calculate_covariance, standard_errors_from_covariance};
pub use distribution::{students_t_cdf, students_t_ppf};

/// Two-tailed 95% critical value of Student's t for `dof` degrees of freedom.
pub fn t_value_95(dof: usize) -> f64 {
    students_t_ppf(0.975, dof as f64)
}
