//! Weighted least-squares curve fitting.
//!
//! [`CurveFit`] fits a vectorised model `f(x, p)` to `(x, y)` data with the
//! Levenberg-Marquardt minimiser and returns the optimal parameters together
//! with their covariance matrix. Residuals are `(f(x, p) - y) / sigma`; with
//! `absolute_sigma = false` the covariance is rescaled by the reduced
//! chi-square, otherwise sigma is taken to be the true standard deviation.

use crate::error::SolverError;
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::problem::Problem;
use crate::uncertainty::calculate_covariance;
use log::debug;
use ndarray::{Array1, Array2, Axis};

/// A model function: `f(x, params)` evaluated elementwise over `x`.
///
/// `'f` bounds whatever the function borrows; stored models use `ModelFn<'static>`.
pub type ModelFn<'f> = dyn Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync + 'f;

/// Partial derivatives of a model: an `x.len() × params.len()` matrix with
/// one column per parameter, in declaration order.
pub type JacobianFn<'f> = dyn Fn(&Array1<f64>, &[f64]) -> Array2<f64> + Send + Sync + 'f;

/// Outcome of a successful curve fit.
#[derive(Debug, Clone)]
pub struct CurveFitResult {
    /// Optimal parameter values
    pub popt: Array1<f64>,

    /// Estimated covariance of `popt`
    pub pcov: Array2<f64>,

    /// Weighted sum of squared residuals at `popt`
    pub cost: f64,

    /// Number of trial steps performed by the minimiser
    pub iterations: usize,

    /// Number of model evaluations
    pub func_evals: usize,

    /// Convergence message from the minimiser
    pub message: String,
}

/// Builder for a single least-squares fit.
pub struct CurveFit<'a> {
    function: &'a ModelFn<'a>,
    jacobian: Option<&'a JacobianFn<'a>>,
    x: &'a Array1<f64>,
    y: &'a Array1<f64>,
    sigma: Option<&'a Array1<f64>>,
    absolute_sigma: bool,
    config: LmConfig,
}

impl<'a> CurveFit<'a> {
    /// Create an unweighted fit of `function` to `(x, y)`.
    pub fn new(function: &'a ModelFn<'a>, x: &'a Array1<f64>, y: &'a Array1<f64>) -> Self {
        Self {
            function,
            jacobian: None,
            x,
            y,
            sigma: None,
            absolute_sigma: false,
            config: LmConfig::default(),
        }
    }

    /// Per-point uncertainties in `y`.
    pub fn with_sigma(mut self, sigma: &'a Array1<f64>) -> Self {
        self.sigma = Some(sigma);
        self
    }

    /// Treat sigma as absolute (no reduced chi-square rescaling of the covariance).
    pub fn with_absolute_sigma(mut self, absolute_sigma: bool) -> Self {
        self.absolute_sigma = absolute_sigma;
        self
    }

    /// Analytic Jacobian of the model; without it derivatives are estimated numerically.
    pub fn with_jacobian(mut self, jacobian: &'a JacobianFn<'a>) -> Self {
        self.jacobian = Some(jacobian);
        self
    }

    /// Solver configuration.
    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the fit starting from `p0`.
    pub fn solve(&self, p0: Array1<f64>) -> Result<CurveFitResult, SolverError> {
        let m = self.x.len();
        let n = p0.len();

        if self.y.len() != m {
            return Err(SolverError::InvalidInput(format!(
                "x and y must have the same length ({} != {})",
                m,
                self.y.len()
            )));
        }

        let inv_sigma = match self.sigma {
            Some(sigma) => {
                if sigma.len() != m {
                    return Err(SolverError::InvalidInput(format!(
                        "sigma has length {}, expected {}",
                        sigma.len(),
                        m
                    )));
                }
                if sigma.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
                    return Err(SolverError::InvalidInput(
                        "sigma must contain positive finite values".to_string(),
                    ));
                }
                Some(sigma.mapv(|s| 1.0 / s))
            }
            None => None,
        };

        let problem = CurveFitProblem {
            function: self.function,
            jacobian: self.jacobian,
            x: self.x,
            y: self.y,
            inv_sigma,
            n_params: n,
        };

        let result = LevenbergMarquardt::with_config(self.config.clone()).minimize(&problem, p0)?;

        let scale = if self.absolute_sigma {
            1.0
        } else {
            if m <= n {
                return Err(SolverError::InvalidCovariance(format!(
                    "cannot rescale covariance with {} residuals for {} parameters",
                    m, n
                )));
            }
            result.cost / (m - n) as f64
        };
        let pcov = calculate_covariance(&result.jacobian, scale)?;

        debug!(
            "curve fit finished after {} iterations ({} evaluations): {}",
            result.iterations, result.func_evals, result.message
        );

        Ok(CurveFitResult {
            popt: result.params,
            pcov,
            cost: result.cost,
            iterations: result.iterations,
            func_evals: result.func_evals,
            message: result.message,
        })
    }
}

/// Fit `function` to `(x, y)` and return `(popt, pcov)`.
///
/// Shorthand for the [`CurveFit`] builder with the default configuration.
pub fn curve_fit(
    function: &ModelFn<'_>,
    x: &Array1<f64>,
    y: &Array1<f64>,
    p0: Array1<f64>,
    sigma: Option<&Array1<f64>>,
    absolute_sigma: bool,
    jacobian: Option<&JacobianFn<'_>>,
) -> Result<(Array1<f64>, Array2<f64>), SolverError> {
    let mut fit = CurveFit::new(function, x, y).with_absolute_sigma(absolute_sigma);
    if let Some(sigma) = sigma {
        fit = fit.with_sigma(sigma);
    }
    if let Some(jacobian) = jacobian {
        fit = fit.with_jacobian(jacobian);
    }
    let result = fit.solve(p0)?;
    Ok((result.popt, result.pcov))
}

/// Adapts a model function and data to the [`Problem`] trait.
struct CurveFitProblem<'a> {
    function: &'a ModelFn<'a>,
    jacobian: Option<&'a JacobianFn<'a>>,
    x: &'a Array1<f64>,
    y: &'a Array1<f64>,
    inv_sigma: Option<Array1<f64>>,
    n_params: usize,
}

impl Problem for CurveFitProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>, SolverError> {
        let p = params.to_vec();
        let model = (self.function)(self.x, &p);
        if model.len() != self.x.len() {
            return Err(SolverError::InvalidInput(format!(
                "model returned {} values for {} data points",
                model.len(),
                self.x.len()
            )));
        }

        let residuals = model - self.y;
        Ok(match &self.inv_sigma {
            Some(w) => residuals * w,
            None => residuals,
        })
    }

    fn parameter_count(&self) -> usize {
        self.n_params
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>, SolverError> {
        let Some(jacobian) = self.jacobian else {
            return crate::utils::finite_difference::jacobian(self, params, None);
        };

        let p = params.to_vec();
        let mut jac = jacobian(self.x, &p);
        if jac.dim() != (self.x.len(), self.n_params) {
            return Err(SolverError::InvalidInput(format!(
                "Jacobian has shape {:?}, expected ({}, {})",
                jac.dim(),
                self.x.len(),
                self.n_params
            )));
        }

        if let Some(w) = &self.inv_sigma {
            for (mut row, wi) in jac.axis_iter_mut(Axis(0)).zip(w.iter()) {
                row *= *wi;
            }
        }
        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        self.jacobian.is_some()
    }
}
