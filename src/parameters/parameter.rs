//! Parameter definition and implementation
//!
//! A [`Parameter`] is one named scalar of a fit model. Its value is the
//! initial guess before a fit and the optimum after one; its uncertainty is
//! the standard error reported by the last successful fit.

use serde::{Deserialize, Serialize};

/// A named fit parameter.
///
/// The uncertainty is zero until a fit succeeds, and is always zero for a
/// parameter that was fixed during that fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    pub name: String,

    /// Current value of the parameter
    value: f64,

    /// Value when created (for reset operations)
    init_value: f64,

    /// Standard error from the last successful fit
    uncertainty: f64,

    /// Whether the parameter is held constant during fitting
    fixed: bool,
}

impl Parameter {
    /// Create a new free parameter with the given name and value
    ///
    /// # Examples
    ///
    /// ```
    /// use curvefit_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("amplitude", 10.0);
    /// assert_eq!(param.name(), "amplitude");
    /// assert_eq!(param.value(), 10.0);
    /// assert_eq!(param.uncertainty(), 0.0);
    /// assert!(!param.fixed());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            uncertainty: 0.0,
            fixed: false,
        }
    }

    /// Create a parameter that is held at `value` during fitting
    pub fn fixed_at(name: &str, value: f64) -> Self {
        Self {
            fixed: true,
            ..Self::new(name, value)
        }
    }

    /// Get the name of the parameter
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current value of the parameter
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter
    ///
    /// For a fixed parameter this is the value it is held at; for a free one
    /// it is the starting point of the next fit.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Get the value the parameter was created with
    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Reset the value to the one the parameter was created with and clear
    /// the uncertainty
    pub fn reset(&mut self) {
        self.value = self.init_value;
        self.uncertainty = 0.0;
    }

    /// Standard error from the last successful fit
    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    /// Check if the parameter is held constant during fitting
    pub fn fixed(&self) -> bool {
        self.fixed
    }

    /// Hold the parameter constant (`true`) or let the solver vary it (`false`)
    pub fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    /// Replace the starting value, keeping the fixed flag.
    pub(crate) fn set_initial(&mut self, value: f64) {
        self.value = value;
        self.init_value = value;
        self.uncertainty = 0.0;
    }

    /// Store the outcome of a fit.
    pub(crate) fn set_fit_result(&mut self, value: f64, uncertainty: f64) {
        self.value = value;
        self.uncertainty = uncertainty;
    }
}
