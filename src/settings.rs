//! Presentation settings.
//!
//! Constants that shape how results are shown rather than how they are
//! computed: curve resolution, digit counts in reports and whether to warn
//! about ignored x uncertainties. Loaded from JSON; missing keys keep their
//! defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of points used to draw a model curve.
    pub model_numpoints: usize,

    /// Digits after the decimal point for floats in the text report.
    pub significant_digits: usize,

    /// Significant digits of the standard error in a parameter summary.
    pub parameter_significant_digits: usize,

    /// Significant digits of a fixed parameter in a parameter summary.
    pub parameter_significant_digits_fixed: usize,

    /// Log a warning when the data carries x uncertainties, which the fit
    /// ignores.
    pub show_x_error_warning: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_numpoints: 200,
            significant_digits: 4,
            parameter_significant_digits: 2,
            parameter_significant_digits_fixed: 4,
            show_x_error_warning: true,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
