//! Fit reports and number formatting.
//!
//! A [`FitReport`] is the read-only summary of one successful fit. It renders
//! as a three-section text block; [`format_parameter`] gives the compact
//! `name = (value ± error) × 10^k` form used next to a plot.

use crate::model::WeightMode;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Outcome for a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterReport {
    pub name: String,
    pub value: f64,
    pub stderr: f64,
    pub fixed: bool,
}

/// Summary of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Model description
    pub model: String,
    /// Weight mode the fit used
    pub weight: WeightMode,
    /// Number of selected data points
    pub n_points: usize,
    /// Selected points minus free parameters
    pub dof: usize,
    /// Two-tailed 95% Student-t value for `dof`
    pub t95: f64,
    /// Per-parameter results in declaration order
    pub parameters: Vec<ParameterReport>,
    /// Weighted residual sum of squares at the optimum
    pub smin: f64,
}

impl FitReport {
    pub fn parameter(&self, name: &str) -> Option<&ParameterReport> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Render the report as text, floats in scientific notation with
    /// `settings.significant_digits` decimals.
    pub fn render(&self, settings: &Settings) -> String {
        let digits = settings.significant_digits;
        let mut out = String::new();

        section(&mut out, "FIT PARAMETERS");
        entry(&mut out, "model", &self.model);
        entry(&mut out, "weight", self.weight.as_str());
        entry(&mut out, "N", &self.n_points.to_string());
        entry(&mut out, "dof", &self.dof.to_string());
        entry(&mut out, "t95-val", &float_to_str(self.t95, digits));
        out.push('\n');

        section(&mut out, "FIT RESULTS");
        for param in &self.parameters {
            out.push_str(&param.name);
            out.push_str("\n\n");
            entry(&mut out, "value", &float_to_str(param.value, digits));
            entry(&mut out, "stderr", &float_to_str(param.stderr, digits));
            entry(&mut out, "fixed", &param.fixed.to_string());
            out.push('\n');
        }
        out.push('\n');

        section(&mut out, "STATISTICS");
        entry(&mut out, "Smin", &float_to_str(self.smin, digits));
        out.push('\n');

        out
    }

    /// One [`format_parameter`] line per parameter.
    pub fn parameter_summary(&self, settings: &Settings) -> String {
        self.parameters
            .iter()
            .map(|p| format_parameter(&p.name, p.value, p.stderr, p.fixed, settings))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&Settings::default()))
    }
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "========== {} ==========\n\n", title);
}

fn entry(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{}\t\t: {}", key, value);
}

/// Scientific notation with `digits` decimals and a signed exponent of at
/// least two digits, e.g. `1.3500e+00`.
pub fn float_to_str(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let formatted = format!("{:.*e}", digits, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}

/// Decimal exponent of `value` after rounding to six significant digits.
pub fn get_exponent(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    format!("{:.5e}", value)
        .split_once('e')
        .and_then(|(_, exponent)| exponent.parse().ok())
        .unwrap_or(0)
}

/// `value` divided by `10^exponent`, with as many decimals as are needed to
/// show `sig_digits` significant digits.
fn scaled_to_string(value: f64, exponent: i32, sig_digits: i32) -> String {
    let decimals = (sig_digits + exponent - get_exponent(value) - 1).max(0) as usize;
    format!("{:.*}", decimals, value / 10f64.powi(exponent))
}

/// Compact parameter summary sharing one power of ten between value and error.
///
/// The error is shown with `settings.parameter_significant_digits` significant
/// digits and the value is given to the same decimal place. A fixed parameter
/// has no error and is shown with `settings.parameter_significant_digits_fixed`
/// digits.
///
/// # Examples
///
/// ```
/// use curvefit_rs::report::format_parameter;
/// use curvefit_rs::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(
///     format_parameter("a", 1.35, 0.037859, false, &settings),
///     "a = (1.350 ± 0.038) × 10^0"
/// );
/// assert_eq!(format_parameter("b", -5.0, 0.0, true, &settings), "b = -5.000 × 10^0");
/// ```
pub fn format_parameter(name: &str, value: f64, stderr: f64, fixed: bool, settings: &Settings) -> String {
    let value_exp = get_exponent(value);
    if fixed {
        let digits = settings.parameter_significant_digits_fixed as i32;
        return format!(
            "{} = {} × 10^{}",
            name,
            scaled_to_string(value, value_exp, digits),
            value_exp
        );
    }

    let digits = settings.parameter_significant_digits as i32;
    let error_exp = get_exponent(stderr);
    let exponent = value_exp.max(error_exp);
    let value_str = scaled_to_string(value, exponent, digits + value_exp - error_exp);
    let error_str = scaled_to_string(stderr, exponent, digits);
    format!("{} = ({} ± {}) × 10^{}", name, value_str, error_str, exponent)
}
