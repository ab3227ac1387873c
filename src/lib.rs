//! # curvefit-rs
//!
//! `curvefit-rs` is the fitting core of an interactive curve-fitting tool:
//! nonlinear least-squares fits of a user model to x/y data, with any subset
//! of the parameters held fixed, optional y uncertainties and a selectable
//! x range.
//!
//! The library provides:
//! - A Levenberg-Marquardt minimiser with numerical or analytic Jacobians
//! - A `curve_fit` primitive returning optimal parameters and their covariance
//! - Fixed-parameter reduction that fits only the free parameters and
//!   reassembles full-size results
//! - A stateful [`FittingEngine`] with fit reports, model curves and residuals
//!
//! ## Basic Usage
//!
//! ```
//! use curvefit_rs::{DataSet, FitModel, FittingEngine, WeightMode};
//! use ndarray::array;
//!
//! let data = DataSet::with_uncertainties(
//!     array![1.0, 2.0, 3.0, 4.0, 5.0],
//!     array![-3.5, -2.4, -1.0, 0.5, 1.8],
//!     None,
//!     Some(array![0.5, 0.4, 0.6, 0.5, 0.8]),
//! )
//! .unwrap();
//! let model = FitModel::new(&["a", "b"], |x, p| x.mapv(|x| p[0] * x + p[1]))
//!     .unwrap()
//!     .with_description("straight line");
//!
//! let mut engine = FittingEngine::new(data, model);
//! engine.set_weight_mode(WeightMode::Relative).unwrap();
//! engine.model_mut().parameter_mut("b").unwrap().set_value(-5.0);
//! engine.model_mut().parameter_mut("b").unwrap().set_fixed(true);
//!
//! let (popt, pcov) = engine.fit().unwrap();
//! assert_eq!(popt[1], -5.0);
//! assert_eq!(pcov[[1, 1]], 0.0);
//! println!("{}", engine.report().unwrap());
//! ```

pub mod error;

pub mod problem;

pub mod lm;

pub mod utils;

pub mod uncertainty;

pub mod curve_fit;

pub mod reduction;

pub mod parameters;

pub mod data;

pub mod model;

pub mod report;

pub mod settings;

pub mod engine;

// Re-exports for convenience
pub use curve_fit::{curve_fit, CurveFit, CurveFitResult};
pub use data::{DataSet, Selection};
pub use engine::{fit_model, FittingEngine};
pub use error::{CurveFitError, FitError, Result, SolverError};
pub use lm::{LevenbergMarquardt, LmConfig};
pub use model::{FitModel, JacobianFn, ModelFn, WeightMode};
pub use parameters::Parameter;
pub use problem::Problem;
pub use report::{FitReport, ParameterReport};
pub use settings::Settings;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
