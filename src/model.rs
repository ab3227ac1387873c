//! Fit model: a user function together with its named parameters.
//!
//! A [`FitModel`] owns the model function `f(x, p) -> y`, an optional analytic
//! Jacobian, one [`Parameter`] per entry of `p`, the [`WeightMode`] used for the
//! next fit and a free-text description.

use crate::data::DataSet;
use crate::error::{CurveFitError, Result};
use crate::parameters::Parameter;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub use crate::curve_fit::{JacobianFn, ModelFn};

/// Description used when none is supplied.
pub const DEFAULT_DESCRIPTION: &str = "no info on model";

/// How the y uncertainty enters the fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    /// Every point has unit weight.
    #[default]
    None,
    /// yerr sets the relative weights; the covariance is rescaled by the
    /// reduced chi-square.
    Relative,
    /// yerr is the true standard deviation; the covariance is not rescaled.
    Absolute,
}

impl WeightMode {
    /// Every mode, in the order a user is offered them.
    pub const ALL: [WeightMode; 3] = [WeightMode::None, WeightMode::Relative, WeightMode::Absolute];

    /// Initial mode for a data set: unweighted without a y uncertainty,
    /// otherwise absolute or relative depending on `absolute_sigma`.
    pub fn default_for(has_yerr: bool, absolute_sigma: bool) -> Self {
        match (has_yerr, absolute_sigma) {
            (false, _) => WeightMode::None,
            (true, true) => WeightMode::Absolute,
            (true, false) => WeightMode::Relative,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightMode::None => "none",
            WeightMode::Relative => "relative",
            WeightMode::Absolute => "absolute",
        }
    }

    /// Whether this mode uses the y uncertainty at all.
    pub fn uses_yerr(&self) -> bool {
        !matches!(self, WeightMode::None)
    }
}

impl fmt::Display for WeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model function with named parameters.
///
/// Parameter names are given explicitly and in the order the function reads
/// them from its parameter slice.
///
/// # Examples
///
/// ```
/// use curvefit_rs::model::FitModel;
/// use ndarray::array;
///
/// let model = FitModel::new(&["a", "b"], |x, p| x.mapv(|x| p[0] * x + p[1]))
///     .unwrap()
///     .with_initial_values(&[2.0, -1.0])
///     .unwrap();
///
/// assert_eq!(model.free_count(), 2);
/// assert_eq!(model.evaluate(&array![0.0, 1.0]).unwrap(), array![-1.0, 1.0]);
/// ```
#[derive(Clone)]
pub struct FitModel {
    function: Arc<ModelFn<'static>>,
    jacobian: Option<Arc<JacobianFn<'static>>>,
    parameters: Vec<Parameter>,
    weight_mode: WeightMode,
    description: String,
}

impl fmt::Debug for FitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitModel")
            .field("parameters", &self.parameters)
            .field("has_jacobian", &self.jacobian.is_some())
            .field("weight_mode", &self.weight_mode)
            .field("description", &self.description)
            .finish()
    }
}

impl FitModel {
    /// Create a model whose parameters all start at 1.0.
    ///
    /// # Errors
    ///
    /// [`CurveFitError::Validation`] for an empty or duplicated parameter name.
    pub fn new<F>(names: &[&str], function: F) -> Result<Self>
    where
        F: Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() {
                return Err(CurveFitError::validation("parameter names must not be empty"));
            }
            if !seen.insert(*name) {
                return Err(CurveFitError::validation(format!(
                    "parameter name '{}' is used more than once",
                    name
                )));
            }
        }

        Ok(Self {
            function: Arc::new(function),
            jacobian: None,
            parameters: names.iter().map(|name| Parameter::new(name, 1.0)).collect(),
            weight_mode: WeightMode::None,
            description: DEFAULT_DESCRIPTION.to_string(),
        })
    }

    /// Set the initial value of every parameter, in declaration order. Fixed
    /// flags are kept.
    ///
    /// # Errors
    ///
    /// [`CurveFitError::Validation`] if `values` does not have one entry per
    /// parameter.
    pub fn with_initial_values(mut self, values: &[f64]) -> Result<Self> {
        if values.len() != self.parameters.len() {
            return Err(CurveFitError::validation(format!(
                "{} initial values given for {} parameters",
                values.len(),
                self.parameters.len()
            )));
        }
        for (param, &value) in self.parameters.iter_mut().zip(values) {
            param.set_initial(value);
        }
        Ok(self)
    }

    /// Attach an analytic Jacobian: one row per x value, one column per
    /// parameter in declaration order.
    pub fn with_jacobian<J>(mut self, jacobian: J) -> Self
    where
        J: Fn(&Array1<f64>, &[f64]) -> Array2<f64> + Send + Sync + 'static,
    {
        self.jacobian = Some(Arc::new(jacobian));
        self
    }

    /// Attach a free-text description. Leading indentation is removed from
    /// every line after the first.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = strip_leading_indentation(description);
        self
    }

    /// Set the weight mode without consulting a data set.
    pub fn with_weight_mode(mut self, mode: WeightMode) -> Self {
        self.weight_mode = mode;
        self
    }

    /// Evaluate the model at `x` with the current parameter values.
    ///
    /// # Errors
    ///
    /// [`CurveFitError::Validation`] if the function does not return one value
    /// per x value.
    pub fn evaluate(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        let y = (self.function)(x, &self.values());
        if y.len() != x.len() {
            return Err(CurveFitError::validation(format!(
                "model returned {} values for {} points",
                y.len(),
                x.len()
            )));
        }
        Ok(y)
    }

    /// Number of parameters the solver may vary.
    pub fn free_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.fixed()).count()
    }

    /// Current parameter values, in declaration order.
    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::value).collect()
    }

    /// Fixed flag per parameter, in declaration order.
    pub fn fixed_flags(&self) -> Vec<bool> {
        self.parameters.iter().map(Parameter::fixed).collect()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(Parameter::name).collect()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Mutable access to the parameters. The slice keeps the parameter count
    /// fixed.
    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name() == name)
    }

    /// Reset every parameter to its initial value.
    pub fn reset(&mut self) {
        self.parameters.iter_mut().for_each(Parameter::reset);
    }

    pub fn weight_mode(&self) -> WeightMode {
        self.weight_mode
    }

    /// Weight mode a session starts from for `data`.
    pub(crate) fn use_default_weight_mode(&mut self, data: &DataSet, absolute_sigma: bool) {
        self.weight_mode = WeightMode::default_for(data.has_yerr(), absolute_sigma);
    }

    /// Choose the weight mode for the next fit.
    ///
    /// # Errors
    ///
    /// [`CurveFitError::Validation`] when `mode` needs a y uncertainty that
    /// `data` does not have.
    pub fn set_weight_mode(&mut self, mode: WeightMode, data: &DataSet) -> Result<()> {
        if mode.uses_yerr() && !data.has_yerr() {
            return Err(CurveFitError::validation(format!(
                "weight mode '{}' requires y uncertainties",
                mode
            )));
        }
        self.weight_mode = mode;
        Ok(())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn function(&self) -> &ModelFn<'static> {
        self.function.as_ref()
    }

    pub fn jacobian(&self) -> Option<&JacobianFn<'static>> {
        self.jacobian.as_deref()
    }

    pub fn has_jacobian(&self) -> bool {
        self.jacobian.is_some()
    }

    /// Write fitted values and standard errors back, in declaration order.
    pub(crate) fn apply_fit(&mut self, values: &Array1<f64>, uncertainties: &Array1<f64>) {
        for ((param, &value), &stderr) in self.parameters.iter_mut().zip(values).zip(uncertainties) {
            param.set_fit_result(value, stderr);
        }
    }
}

/// Remove runs of four-space indentation at the start of every line but the
/// first.
fn strip_leading_indentation(text: &str) -> String {
    let mut lines = text.split('\n');
    let mut result = lines.next().unwrap_or_default().to_string();
    for line in lines {
        let mut line = line;
        while let Some(rest) = line.strip_prefix("    ") {
            line = rest;
        }
        result.push('\n');
        result.push_str(line);
    }
    result
}
