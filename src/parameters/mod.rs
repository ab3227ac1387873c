//! # Parameter System
//!
//! Named scalar parameters of a fit model. Each [`Parameter`] carries its
//! current value, a fixed/free flag that decides whether the solver may vary
//! it, and the standard error from the last successful fit.
//!
//! ## Example Usage
//!
//! ```rust
//! use curvefit_rs::parameters::Parameter;
//!
//! let mut offset = Parameter::new("b", 1.0);
//!
//! // hold the offset at -5 during the next fit
//! offset.set_value(-5.0);
//! offset.set_fixed(true);
//! assert!(offset.fixed());
//! ```

pub mod parameter;

pub use parameter::Parameter;
