//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the core implementation of the Levenberg-Marquardt algorithm
//! for nonlinear least-squares optimization. Each trial step solves the damped
//! normal equations (JᵀJ + λD) δ = -Jᵀr, where D is the diagonal of JᵀJ
//! (Marquardt scaling), and the damping λ is adapted after every trial.

use log::debug;
use ndarray::{Array1, Array2, Axis};

use crate::error::SolverError;
use crate::problem::Problem;
use crate::utils::finite_difference;
use crate::utils::matrix_convert::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra};

use super::config::LmConfig;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of trial steps performed
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// A message describing which criterion stopped the iteration
    pub message: String,

    /// The Jacobian matrix of the residuals at the solution
    pub jacobian: Array2<f64>,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    ///
    /// # Errors
    ///
    /// * [`SolverError::InvalidInput`] for shape problems or a non-finite initial guess
    /// * [`SolverError::FunctionEvaluation`] if the residuals at the initial guess are not finite
    /// * [`SolverError::ConvergenceFailure`] if no tolerance is met within the budget
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult, SolverError> {
        let n_params = problem.parameter_count();
        let n_residuals = problem.residual_count();

        if initial_params.len() != n_params {
            return Err(SolverError::InvalidInput(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if n_params == 0 {
            return Err(SolverError::InvalidInput(
                "at least one parameter is required".to_string(),
            ));
        }
        if n_residuals < n_params {
            return Err(SolverError::InvalidInput(format!(
                "func input vector length N={} must not exceed func output vector length M={}",
                n_params, n_residuals
            )));
        }
        if initial_params.iter().any(|p| !p.is_finite()) {
            return Err(SolverError::InvalidInput(
                "initial parameter values must be finite".to_string(),
            ));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;

        if residuals.len() != n_residuals {
            return Err(SolverError::InvalidInput(format!(
                "Expected {} residuals, got {}",
                n_residuals,
                residuals.len()
            )));
        }
        if residuals.iter().any(|r| !r.is_finite()) {
            return Err(SolverError::FunctionEvaluation(
                "residuals are not finite at the initial parameter values".to_string(),
            ));
        }

        let mut cost = sum_of_squares(&residuals);
        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;
        let mut jacobian = self.jacobian(problem, &params, &residuals, &mut func_evals)?;

        loop {
            let jtj = jacobian.t().dot(&jacobian);
            let gradient = jacobian.t().dot(&residuals);

            let gradient_norm = scaled_gradient_norm(&jacobian, &gradient, cost.sqrt());
            if gradient_norm <= self.config.gtol {
                return Ok(LmResult {
                    params,
                    cost,
                    iterations,
                    func_evals,
                    message: format!(
                        "The cosine of the angle between the residuals and any Jacobian column is at most {:.2e} ({:.2e})",
                        self.config.gtol, gradient_norm
                    ),
                    jacobian,
                });
            }

            if iterations >= self.config.max_iterations {
                return Err(SolverError::ConvergenceFailure(format!(
                    "Number of iterations exceeded maximum ({})",
                    self.config.max_iterations
                )));
            }
            iterations += 1;

            let step = match solve_damped(&jtj, &gradient, lambda) {
                Some(step) => step,
                None => {
                    lambda = self.increase_lambda(lambda)?;
                    continue;
                }
            };

            let new_params = &params + &step;
            let new_residuals = problem.eval(&new_params)?;
            func_evals += 1;

            let new_cost = if new_residuals.len() == n_residuals
                && new_residuals.iter().all(|r| r.is_finite())
            {
                sum_of_squares(&new_residuals)
            } else {
                f64::INFINITY
            };

            // Reduction predicted by the linear model |r + Jδ|²
            let predicted = -(2.0 * step.dot(&gradient) + step.dot(&jtj.dot(&step)));
            let actual = cost - new_cost;
            let (actual_rel, predicted_rel) = if cost > 0.0 {
                (actual / cost, predicted / cost)
            } else {
                (actual, predicted)
            };
            let ratio = if predicted != 0.0 { actual / predicted } else { 0.0 };

            let reduction_converged = actual_rel.abs() <= self.config.ftol
                && predicted_rel <= self.config.ftol
                && 0.5 * ratio <= 1.0;

            // each component is measured against its own magnitude
            let mut step_converged = false;
            if new_cost < cost {
                step_converged = step.iter().zip(params.iter()).all(|(d, p)| {
                    d.abs() <= self.config.xtol * (p.abs() + self.config.xtol)
                });
                params = new_params;
                residuals = new_residuals;
                cost = new_cost;
                lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);
                jacobian = self.jacobian(problem, &params, &residuals, &mut func_evals)?;

                debug!(
                    "lm iteration {}: cost = {:.6e}, lambda = {:.1e}, |step| = {:.2e}",
                    iterations, cost, lambda, norm(&step)
                );
            } else {
                debug!(
                    "lm iteration {}: step rejected (cost {:.6e} -> {:.6e}), lambda = {:.1e}",
                    iterations, cost, new_cost, lambda
                );
            }

            if reduction_converged || step_converged {
                let message = if reduction_converged {
                    format!(
                        "Both actual and predicted relative reductions in the sum of squares are at most {:.2e}",
                        self.config.ftol
                    )
                } else {
                    format!(
                        "The relative error between two consecutive iterates is at most {:.2e}",
                        self.config.xtol
                    )
                };
                return Ok(LmResult {
                    params,
                    cost,
                    iterations,
                    func_evals,
                    message,
                    jacobian,
                });
            }

            if new_cost >= cost {
                lambda = self.increase_lambda(lambda)?;
            }
        }
    }

    fn increase_lambda(&self, lambda: f64) -> Result<f64, SolverError> {
        let lambda = lambda * self.config.lambda_up_factor;
        if lambda > self.config.max_lambda {
            return Err(SolverError::ConvergenceFailure(
                "failed to decrease the sum of squares and the damping reached its maximum"
                    .to_string(),
            ));
        }
        Ok(lambda)
    }

    /// Jacobian of the residuals, analytic when the problem provides one.
    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
        func_evals: &mut usize,
    ) -> Result<Array2<f64>, SolverError> {
        let jac = if problem.has_custom_jacobian() {
            problem.jacobian(params)?
        } else {
            *func_evals += params.len();
            finite_difference::jacobian_from(problem, params, residuals, self.config.diff_step)?
        };

        let expected = (problem.residual_count(), problem.parameter_count());
        if jac.dim() != expected {
            return Err(SolverError::InvalidInput(format!(
                "Expected Jacobian of shape {:?}, got {:?}",
                expected,
                jac.dim()
            )));
        }
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::FunctionEvaluation(
                "Jacobian contains non-finite values".to_string(),
            ));
        }
        Ok(jac)
    }
}

/// Solve (JᵀJ + λD) δ = -g with D = diag(JᵀJ), returning `None` if the damped
/// matrix is not positive definite.
fn solve_damped(jtj: &Array2<f64>, gradient: &Array1<f64>, lambda: f64) -> Option<Array1<f64>> {
    let mut a = jtj.clone();
    for i in 0..a.nrows() {
        // zero columns (parameters without influence) still get damped
        let d = if jtj[[i, i]] > 0.0 { jtj[[i, i]] } else { 1.0 };
        a[[i, i]] += lambda * d;
    }

    let cholesky = ndarray_to_nalgebra(&a).cholesky()?;
    let rhs = -ndarray_vec_to_nalgebra(gradient);
    let step = nalgebra_vec_to_ndarray(&cholesky.solve(&rhs));

    if step.iter().all(|s| s.is_finite()) {
        Some(step)
    } else {
        None
    }
}

/// Largest cosine between the residual vector and a column of the Jacobian,
/// `max_j |J_jᵀr| / (|J_j| |r|)`. Columns without influence are skipped.
fn scaled_gradient_norm(jacobian: &Array2<f64>, gradient: &Array1<f64>, residual_norm: f64) -> f64 {
    if residual_norm == 0.0 {
        return 0.0;
    }
    jacobian
        .axis_iter(Axis(1))
        .zip(gradient.iter())
        .filter_map(|(column, g)| {
            let column_norm = norm(&column.to_owned());
            (column_norm > 0.0).then(|| g.abs() / (column_norm * residual_norm))
        })
        .fold(0.0_f64, f64::max)
}

fn sum_of_squares(v: &Array1<f64>) -> f64 {
    v.iter().map(|r| r * r).sum()
}

fn norm(v: &Array1<f64>) -> f64 {
    sum_of_squares(v).sqrt()
}
