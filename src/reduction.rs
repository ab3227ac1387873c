//! Fixed-parameter reduction.
//!
//! The solver only ever sees the free parameters. A [`ParameterPartition`]
//! splits the declared parameters into free and fixed indices; the model (and
//! its Jacobian, if any) is wrapped in a closure that re-inserts the fixed
//! values at their declared positions before delegating, and the solver's
//! reduced optimum and covariance are expanded back to full dimension with
//! the fixed parameters carrying zero variance and zero covariance.

use crate::curve_fit::{CurveFit, CurveFitResult, JacobianFn, ModelFn};
use crate::error::SolverError;
use crate::lm::LmConfig;
use log::debug;
use ndarray::{Array1, Array2, Axis};

/// Free/fixed split of an ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterPartition {
    free: Vec<usize>,
    fixed: Vec<usize>,
}

impl ParameterPartition {
    /// Partition by fixed flag, keeping declaration order within each group.
    pub fn from_flags(fixed_flags: &[bool]) -> Self {
        let (fixed, free): (Vec<usize>, Vec<usize>) =
            (0..fixed_flags.len()).partition(|&i| fixed_flags[i]);
        Self { free, fixed }
    }

    /// Indices of the free parameters, ascending.
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Indices of the fixed parameters, ascending.
    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    /// Total number of parameters.
    pub fn len(&self) -> usize {
        self.free.len() + self.fixed.len()
    }

    /// Whether the partition covers no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full parameter vector: `free_values` at the free indices, `template`
    /// values everywhere else.
    pub fn expand(&self, free_values: &[f64], template: &[f64]) -> Vec<f64> {
        let mut full = template.to_vec();
        for (&index, &value) in self.free.iter().zip(free_values) {
            full[index] = value;
        }
        full
    }

    /// The free entries of a full parameter vector.
    pub fn select_free(&self, full: &[f64]) -> Array1<f64> {
        self.free.iter().map(|&i| full[i]).collect()
    }

    /// The columns of a full Jacobian that belong to free parameters.
    ///
    /// A matrix with the wrong number of columns is returned unchanged so the
    /// solver's shape check reports it.
    pub fn select_columns(&self, jacobian: Array2<f64>) -> Array2<f64> {
        if jacobian.ncols() != self.len() {
            return jacobian;
        }
        jacobian.select(Axis(1), &self.free)
    }

    /// Insert each fixed value into `popt_free` at its declared index.
    ///
    /// Fixed indices are processed in ascending order, so every insertion
    /// position refers to the vector after the previous insertions.
    pub fn reassemble_params(&self, popt_free: &Array1<f64>, template: &[f64]) -> Array1<f64> {
        let mut popt = popt_free.to_vec();
        for &index in &self.fixed {
            popt.insert(index, template[index]);
        }
        Array1::from_vec(popt)
    }

    /// Insert a zero row and a zero column at every fixed index of `cov_free`.
    pub fn reassemble_covariance(&self, cov_free: &Array2<f64>) -> Array2<f64> {
        let mut cov = cov_free.clone();
        for &index in &self.fixed {
            cov = insert_zero_row_and_column(&cov, index);
        }
        cov
    }
}

fn insert_zero_row_and_column(matrix: &Array2<f64>, index: usize) -> Array2<f64> {
    let n = matrix.nrows() + 1;
    let source = |k: usize| if k < index { Some(k) } else if k > index { Some(k - 1) } else { None };
    Array2::from_shape_fn((n, n), |(i, j)| match (source(i), source(j)) {
        (Some(si), Some(sj)) => matrix[[si, sj]],
        _ => 0.0,
    })
}

/// Curve fit in which the parameters flagged in `fixed` are held at their
/// `p0` values.
///
/// The returned `popt` and `pcov` have full dimension, in declaration order.
/// `cost`, `iterations` and the other diagnostics are those of the reduced fit.
#[allow(clippy::too_many_arguments)]
pub fn fit_with_fixed(
    function: &ModelFn<'_>,
    jacobian: Option<&JacobianFn<'_>>,
    x: &Array1<f64>,
    y: &Array1<f64>,
    sigma: Option<&Array1<f64>>,
    absolute_sigma: bool,
    p0: &[f64],
    fixed: &[bool],
    config: &LmConfig,
) -> Result<CurveFitResult, SolverError> {
    if p0.len() != fixed.len() {
        return Err(SolverError::InvalidInput(format!(
            "{} initial values for {} fixed flags",
            p0.len(),
            fixed.len()
        )));
    }

    let partition = ParameterPartition::from_flags(fixed);
    if partition.free().is_empty() {
        return Err(SolverError::InvalidInput(
            "all parameters are fixed".to_string(),
        ));
    }
    debug!(
        "fitting {} free parameter(s) {:?}, holding {:?} fixed",
        partition.free().len(),
        partition.free(),
        partition.fixed()
    );

    let template = p0.to_vec();
    let (partition_ref, template_ref) = (&partition, &template);

    let reduced_function = move |x: &Array1<f64>, free: &[f64]| {
        function(x, &partition_ref.expand(free, template_ref))
    };
    let reduced_jacobian = jacobian.map(|jacobian| {
        move |x: &Array1<f64>, free: &[f64]| {
            partition_ref.select_columns(jacobian(x, &partition_ref.expand(free, template_ref)))
        }
    });

    let mut fit = CurveFit::new(&reduced_function, x, y)
        .with_absolute_sigma(absolute_sigma)
        .with_config(config.clone());
    if let Some(sigma) = sigma {
        fit = fit.with_sigma(sigma);
    }
    if let Some(reduced_jacobian) = reduced_jacobian.as_ref() {
        fit = fit.with_jacobian(reduced_jacobian);
    }

    let reduced = fit.solve(partition.select_free(&template))?;

    Ok(CurveFitResult {
        popt: partition.reassemble_params(&reduced.popt, &template),
        pcov: partition.reassemble_covariance(&reduced.pcov),
        ..reduced
    })
}
