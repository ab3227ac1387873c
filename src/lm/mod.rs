//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the damped least-squares minimiser that backs
//! [`curve_fit`](crate::curve_fit).

pub mod algorithm;
pub mod config;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
