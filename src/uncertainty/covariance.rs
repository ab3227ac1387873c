//! # Covariance Matrix Calculations
//!
//! This module provides functions for calculating and manipulating covariance
//! matrices from Jacobian matrices in nonlinear least-squares optimization.

use crate::error::SolverError;
use crate::utils::matrix_convert::ndarray_to_nalgebra;
use ndarray::{Array1, Array2};

/// Relative singular value below which the column-normalised Jacobian is
/// considered rank deficient.
pub const RANK_TOLERANCE: f64 = 1e-12;

/// Calculate covariance matrix from Jacobian matrix.
///
/// For nonlinear least-squares problems, the covariance matrix is estimated as:
///   covar = scale * inv(J^T * J)
/// where J is the Jacobian of the (weighted) residuals and `scale` is either
/// 1 (sigma taken as absolute) or the reduced chi-square.
///
/// The inverse is formed from the SVD of J with unit-norm columns, so the rank
/// test does not depend on the scale of individual parameters.
///
/// # Errors
///
/// * [`SolverError::SingularJacobian`] if J is numerically rank deficient
/// * [`SolverError::InvalidCovariance`] if the result is not finite
pub fn calculate_covariance(jacobian: &Array2<f64>, scale: f64) -> Result<Array2<f64>, SolverError> {
    let (m, n) = jacobian.dim();
    if m < n {
        return Err(SolverError::SingularJacobian(format!(
            "{} residuals cannot determine {} parameters",
            m, n
        )));
    }

    let norms: Vec<f64> = jacobian
        .columns()
        .into_iter()
        .map(|c| c.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();
    if let Some(i) = norms.iter().position(|norm| *norm == 0.0) {
        return Err(SolverError::SingularJacobian(format!(
            "parameter {} has no influence on the residuals",
            i
        )));
    }

    let mut normalised = ndarray_to_nalgebra(jacobian);
    for (j, norm) in norms.iter().enumerate() {
        normalised.column_mut(j).unscale_mut(*norm);
    }

    let svd = normalised.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        SolverError::SingularJacobian("singular value decomposition failed".to_string())
    })?;
    let singular_values = svd.singular_values;

    let s_max = singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let rank = singular_values
        .iter()
        .filter(|s| **s > RANK_TOLERANCE * s_max)
        .count();
    if rank < n {
        return Err(SolverError::SingularJacobian(format!(
            "Jacobian at the solution has rank {} for {} parameters",
            rank, n
        )));
    }

    // inv(JᵀJ) = D⁻¹ V S⁻² Vᵀ D⁻¹ with D the column norms
    let covar = Array2::from_shape_fn((n, n), |(i, j)| {
        let inner: f64 = (0..singular_values.len())
            .map(|k| v_t[(k, i)] * v_t[(k, j)] / (singular_values[k] * singular_values[k]))
            .sum();
        scale * inner / (norms[i] * norms[j])
    });

    if covar.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::InvalidCovariance(
            "covariance matrix contains non-finite values".to_string(),
        ));
    }

    Ok(covar)
}

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
///
/// Rows and columns with zero variance (fixed parameters) are zero apart
/// from the unit diagonal.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}
