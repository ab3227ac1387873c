//! The fitting engine.
//!
//! [`fit_model`] runs one fit of a [`FitModel`] to the selected points of a
//! [`DataSet`]: it checks the preconditions, derives the solver weights from the
//! model's [`WeightMode`], fits the free parameters with the fixed ones held
//! at their current values, writes the optimum and standard errors back onto
//! the model and summarises the result in a [`FitReport`].
//!
//! [`FittingEngine`] owns a data set and a model for an interactive session
//! and keeps the report of the last successful fit.

use crate::data::DataSet;
use crate::error::{FitError, Result};
use crate::lm::LmConfig;
use crate::model::{FitModel, WeightMode};
use crate::reduction::fit_with_fixed;
use crate::report::{FitReport, ParameterReport};
use crate::settings::Settings;
use crate::uncertainty::{standard_errors_from_covariance, t_value_95};
use log::{info, warn};
use ndarray::{Array1, Array2};

/// Fit `model` to the selected points of `data`.
///
/// On success the model's parameters hold the optimum and its standard
/// errors, and `(popt, pcov, report)` is returned with `popt` and `pcov` in
/// parameter declaration order. Fixed parameters keep their value and have
/// zero variance and covariance. On failure `model` is left untouched.
///
/// # Errors
///
/// * [`FitError::NoFreeParameters`] if every parameter is fixed
/// * [`FitError::InsufficientDegreesOfFreedom`] if the selection has no more
///   points than there are free parameters
/// * [`crate::error::SolverError`] (wrapped) if the solver fails
pub fn fit_model(
    data: &DataSet,
    model: &mut FitModel,
    config: &LmConfig,
    settings: &Settings,
) -> Result<(Array1<f64>, Array2<f64>, FitReport)> {
    let free = model.free_count();
    if free == 0 {
        return Err(FitError::NoFreeParameters.into());
    }
    let n_points = data.count();
    if n_points <= free {
        return Err(FitError::InsufficientDegreesOfFreedom { points: n_points, free }.into());
    }

    let selection = data.selected();
    if selection.xerr.is_some() && settings.show_x_error_warning {
        warn!("x uncertainties are not taken into account by the fit");
    }

    let weight = effective_weight_mode(model.weight_mode(), data);
    let (sigma, absolute_sigma) = match (weight, selection.yerr) {
        (WeightMode::Relative, Some(yerr)) => (yerr, false),
        (WeightMode::Absolute, Some(yerr)) => (yerr, true),
        _ => (Array1::ones(n_points), false),
    };

    let result = fit_with_fixed(
        model.function(),
        model.jacobian(),
        &selection.x,
        &selection.y,
        Some(&sigma),
        absolute_sigma,
        &model.values(),
        &model.fixed_flags(),
        config,
    )?;

    let fitted = model.function()(&selection.x, &result.popt.to_vec());
    let smin: f64 = (&selection.y - &fitted)
        .iter()
        .zip(&sigma)
        .map(|(r, s)| (r / s).powi(2))
        .sum();
    let stderr = standard_errors_from_covariance(&result.pcov);

    let dof = n_points - free;
    let report = FitReport {
        model: model.description().to_string(),
        weight,
        n_points,
        dof,
        t95: t_value_95(dof),
        parameters: model
            .parameters()
            .iter()
            .zip(result.popt.iter().zip(&stderr))
            .map(|(param, (&value, &stderr))| ParameterReport {
                name: param.name().to_string(),
                value,
                stderr,
                fixed: param.fixed(),
            })
            .collect(),
        smin,
    };

    model.apply_fit(&result.popt, &stderr);
    info!(
        "fit converged: {} points, {} dof, Smin = {:.6e} after {} iterations",
        n_points, dof, smin, result.iterations
    );

    Ok((result.popt, result.pcov, report))
}

/// The weight mode a fit will actually use: modes that need a y uncertainty
/// fall back to [`WeightMode::None`] when the data has none.
fn effective_weight_mode(mode: WeightMode, data: &DataSet) -> WeightMode {
    if mode.uses_yerr() && !data.has_yerr() {
        warn!("weight mode '{}' needs y uncertainties; fitting unweighted", mode);
        WeightMode::None
    } else {
        mode
    }
}

/// Evenly spaced points from `start` to `end`, both included.
fn linspace(start: f64, end: f64, num_points: usize) -> Array1<f64> {
    match num_points {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => Array1::linspace(start, end, num_points),
    }
}

/// A data set and a model fitted together over an interactive session.
///
/// The engine keeps the report of the last successful fit. Until the first
/// fit succeeds the fit-dependent accessors return `None`.
///
/// # Examples
///
/// ```
/// use curvefit_rs::{DataSet, FitModel, FittingEngine};
/// use ndarray::array;
///
/// let data = DataSet::new(array![1.0, 2.0, 3.0, 4.0, 5.0], array![-3.5, -2.4, -1.0, 0.5, 1.8]).unwrap();
/// let model = FitModel::new(&["a", "b"], |x, p| x.mapv(|x| p[0] * x + p[1])).unwrap();
///
/// let mut engine = FittingEngine::new(data, model);
/// assert!(engine.residuals().unwrap().is_none());
///
/// let (popt, _pcov) = engine.fit().unwrap();
/// assert!((popt[0] - 1.35).abs() < 1e-6);
/// assert_eq!(engine.report().unwrap().dof, 3);
/// ```
#[derive(Debug, Clone)]
pub struct FittingEngine {
    data: DataSet,
    model: FitModel,
    config: LmConfig,
    settings: Settings,
    absolute_sigma: bool,
    report: Option<FitReport>,
}

impl FittingEngine {
    /// Start a session. The weight mode is `relative` when `data` has a y
    /// uncertainty and `none` otherwise.
    pub fn new(data: DataSet, mut model: FitModel) -> Self {
        model.use_default_weight_mode(&data, false);
        Self {
            data,
            model,
            config: LmConfig::default(),
            settings: Settings::default(),
            absolute_sigma: false,
            report: None,
        }
    }

    /// Treat the y uncertainty as absolute: data with `yerr` then starts in
    /// `absolute` rather than `relative` mode.
    pub fn with_absolute_sigma(mut self, absolute_sigma: bool) -> Self {
        self.absolute_sigma = absolute_sigma;
        self.model.use_default_weight_mode(&self.data, absolute_sigma);
        self
    }

    /// Solver configuration for subsequent fits.
    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn data(&self) -> &DataSet {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataSet {
        &mut self.data
    }

    /// Swap in a new data set. The weight mode goes back to the default for
    /// it and the previous report is dropped.
    pub fn set_data(&mut self, data: DataSet) {
        self.model.use_default_weight_mode(&data, self.absolute_sigma);
        self.data = data;
        self.report = None;
    }

    pub fn model(&self) -> &FitModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut FitModel {
        &mut self.model
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Give back the data set and the model.
    pub fn into_parts(self) -> (DataSet, FitModel) {
        (self.data, self.model)
    }

    /// Select the points with `xmin <= x <= xmax` for the next fit.
    pub fn set_range(&mut self, xmin: f64, xmax: f64) {
        self.data.set_range(xmin, xmax);
    }

    /// Choose the weight mode for the next fit.
    pub fn set_weight_mode(&mut self, mode: WeightMode) -> Result<()> {
        self.model.set_weight_mode(mode, &self.data)
    }

    /// Weight modes available for the current data.
    pub fn weight_options(&self) -> &'static [WeightMode] {
        self.data.weight_options()
    }

    /// Selected points minus free parameters; may be zero or negative.
    pub fn degrees_of_freedom(&self) -> i64 {
        self.data.count() as i64 - self.model.free_count() as i64
    }

    /// Fit the model to the selected data and keep the report.
    ///
    /// A failed fit keeps the parameters and the previous report.
    pub fn fit(&mut self) -> Result<(Array1<f64>, Array2<f64>)> {
        let (popt, pcov, report) = fit_model(&self.data, &mut self.model, &self.config, &self.settings)?;
        self.report = Some(report);
        Ok((popt, pcov))
    }

    /// Whether a fit has succeeded.
    pub fn is_fit_valid(&self) -> bool {
        self.report.is_some()
    }

    /// Report of the last successful fit.
    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }

    /// The current model evaluated over an evenly spaced grid.
    ///
    /// `xmin` and `xmax` default to the extent of the data and `num_points` to
    /// `Settings::model_numpoints`.
    pub fn curve(
        &self,
        xmin: Option<f64>,
        xmax: Option<f64>,
        num_points: Option<usize>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let (data_min, data_max) = self.data.x_bounds();
        let x = linspace(
            xmin.unwrap_or(data_min),
            xmax.unwrap_or(data_max),
            num_points.unwrap_or(self.settings.model_numpoints),
        );
        let y = self.model.evaluate(&x)?;
        Ok((x, y))
    }

    /// Like [`FittingEngine::curve`], but `None` until a fit has succeeded.
    pub fn fit_curve(
        &self,
        xmin: Option<f64>,
        xmax: Option<f64>,
        num_points: Option<usize>,
    ) -> Result<Option<(Array1<f64>, Array1<f64>)>> {
        if !self.is_fit_valid() {
            return Ok(None);
        }
        self.curve(xmin, xmax, num_points).map(Some)
    }

    /// `y - f(x)` over every point, selected or not; `None` until a fit has
    /// succeeded.
    pub fn residuals(&self) -> Result<Option<Array1<f64>>> {
        if !self.is_fit_valid() {
            return Ok(None);
        }
        self.model_residuals().map(Some)
    }

    /// `y - f(x)` over every point with the current parameter values, fitted
    /// or not.
    pub fn model_residuals(&self) -> Result<Array1<f64>> {
        Ok(self.data.y() - &self.model.evaluate(self.data.x())?)
    }
}
