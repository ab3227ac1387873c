//! Observed data to be fit.
//!
//! A [`DataSet`] holds the x and y observations, optional uncertainties on
//! either, and an inclusion mask derived from an inclusive x range. Only the
//! points inside the range take part in a fit.

use crate::error::{CurveFitError, Result};
use crate::model::WeightMode;
use ndarray::Array1;

/// The masked subset of a [`DataSet`], in the original order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub xerr: Option<Array1<f64>>,
    pub yerr: Option<Array1<f64>>,
}

/// x/y observations with optional uncertainties and a range mask.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    x: Array1<f64>,
    y: Array1<f64>,
    xerr: Option<Array1<f64>>,
    yerr: Option<Array1<f64>>,
    range: (f64, f64),
    mask: Vec<bool>,
}

impl DataSet {
    /// Create a data set without uncertainties.
    ///
    /// # Errors
    ///
    /// [`CurveFitError::Validation`] if `x` is empty or `x` and `y` differ in
    /// length.
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        Self::with_uncertainties(x, y, None, None)
    }

    /// Create a data set with optional x and y uncertainties.
    ///
    /// # Arguments
    ///
    /// * `x` - Independent variable
    /// * `y` - Observations, same length as `x`
    /// * `xerr` - Uncertainty on `x`; recorded but never part of the objective
    /// * `yerr` - Uncertainty on `y`; used as sigma by the relative and absolute weight modes
    ///
    /// # Errors
    ///
    /// [`CurveFitError::Validation`] on an empty data set or any length mismatch.
    pub fn with_uncertainties(
        x: Array1<f64>,
        y: Array1<f64>,
        xerr: Option<Array1<f64>>,
        yerr: Option<Array1<f64>>,
    ) -> Result<Self> {
        if x.is_empty() {
            return Err(CurveFitError::validation("data set must contain at least one point"));
        }
        if x.len() != y.len() {
            return Err(CurveFitError::validation(format!(
                "xdata and ydata should be of equal length ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        check_uncertainty("xerr", "xdata", xerr.as_ref(), x.len())?;
        check_uncertainty("yerr", "ydata", yerr.as_ref(), y.len())?;

        let mask = vec![true; x.len()];
        Ok(Self {
            x,
            y,
            xerr,
            yerr,
            range: (f64::NEG_INFINITY, f64::INFINITY),
            mask,
        })
    }

    /// Attach an x uncertainty.
    pub fn with_xerr(mut self, xerr: Array1<f64>) -> Result<Self> {
        check_uncertainty("xerr", "xdata", Some(&xerr), self.x.len())?;
        self.xerr = Some(xerr);
        Ok(self)
    }

    /// Attach a y uncertainty.
    pub fn with_yerr(mut self, yerr: Array1<f64>) -> Result<Self> {
        check_uncertainty("yerr", "ydata", Some(&yerr), self.y.len())?;
        self.yerr = Some(yerr);
        Ok(self)
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn xerr(&self) -> Option<&Array1<f64>> {
        self.xerr.as_ref()
    }

    pub fn yerr(&self) -> Option<&Array1<f64>> {
        self.yerr.as_ref()
    }

    pub fn has_xerr(&self) -> bool {
        self.xerr.is_some()
    }

    pub fn has_yerr(&self) -> bool {
        self.yerr.is_some()
    }

    /// Total number of points, selected or not.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Select the points with `xmin <= x <= xmax`.
    ///
    /// An inverted range selects nothing; NaN x values are never selected.
    pub fn set_range(&mut self, xmin: f64, xmax: f64) {
        self.range = (xmin, xmax);
        self.mask = self.x.iter().map(|&x| xmin <= x && x <= xmax).collect();
    }

    /// Select every point again.
    pub fn clear_range(&mut self) {
        self.set_range(f64::NEG_INFINITY, f64::INFINITY);
    }

    /// The inclusive range last passed to [`DataSet::set_range`].
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Inclusion flag per point.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Number of points inside the current range.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&included| included).count()
    }

    /// The selected points, in their original order.
    pub fn selected(&self) -> Selection {
        Selection {
            x: self.masked(&self.x),
            y: self.masked(&self.y),
            xerr: self.xerr.as_ref().map(|e| self.masked(e)),
            yerr: self.yerr.as_ref().map(|e| self.masked(e)),
        }
    }

    /// Smallest and largest x over the whole data set.
    pub fn x_bounds(&self) -> (f64, f64) {
        self.x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
    }

    /// Weight modes that make sense for this data: all three with a y
    /// uncertainty, only [`WeightMode::None`] without one.
    pub fn weight_options(&self) -> &'static [WeightMode] {
        if self.has_yerr() {
            &[WeightMode::None, WeightMode::Relative, WeightMode::Absolute]
        } else {
            &[WeightMode::None]
        }
    }

    fn masked(&self, values: &Array1<f64>) -> Array1<f64> {
        values
            .iter()
            .zip(&self.mask)
            .filter(|&(_, &included)| included)
            .map(|(&v, _)| v)
            .collect()
    }
}

fn check_uncertainty(name: &str, paired: &str, values: Option<&Array1<f64>>, len: usize) -> Result<()> {
    match values {
        Some(values) if values.len() != len => Err(CurveFitError::validation(format!(
            "{} and {} should be of equal length ({} vs {})",
            name,
            paired,
            values.len(),
            len
        ))),
        _ => Ok(()),
    }
}
