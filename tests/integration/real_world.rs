//! Fits of noisy synthetic measurements.
//!
//! Data are generated from known parameters with seeded Gaussian noise, so the
//! recovered values can be checked against their reported uncertainties.

use crate::test_helpers::init_logger;
use approx::assert_relative_eq;
use curvefit_rs::{DataSet, FitModel, FittingEngine, WeightMode};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn gaussian(x: &Array1<f64>, p: &[f64]) -> Array1<f64> {
    let (amplitude, center, width, offset) = (p[0], p[1], p[2], p[3]);
    x.mapv(|x| amplitude * (-(x - center).powi(2) / (2.0 * width * width)).exp() + offset)
}

fn gaussian_jacobian(x: &Array1<f64>, p: &[f64]) -> Array2<f64> {
    let (amplitude, center, width) = (p[0], p[1], p[2]);
    let mut jac = Array2::zeros((x.len(), 4));
    for (i, &x) in x.iter().enumerate() {
        let d = x - center;
        let e = (-d * d / (2.0 * width * width)).exp();
        jac[[i, 0]] = e;
        jac[[i, 1]] = amplitude * e * d / (width * width);
        jac[[i, 2]] = amplitude * e * d * d / width.powi(3);
        jac[[i, 3]] = 1.0;
    }
    jac
}

/// Samples of `truth` at `x` plus normal noise of standard deviation `noise`.
fn noisy(truth: &Array1<f64>, noise: f64, seed: u64) -> Array1<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise).unwrap();
    truth.mapv(|y| y + normal.sample(&mut rng))
}

fn peak_data(seed: u64) -> DataSet {
    let x = Array1::linspace(-5.0, 5.0, 81);
    let truth = gaussian(&x, &[4.0, 0.5, 1.2, 0.3]);
    let y = noisy(&truth, 0.1, seed);
    DataSet::new(x, y).unwrap().with_yerr(Array1::from_elem(81, 0.1)).unwrap()
}

fn peak_model() -> FitModel {
    FitModel::new(&["amplitude", "center", "width", "offset"], gaussian)
        .unwrap()
        .with_initial_values(&[3.0, 0.0, 1.0, 0.0])
        .unwrap()
        .with_description(
            "Gaussian peak on a constant background
            amplitude * exp(-(x - center)^2 / (2 width^2)) + offset",
        )
}

#[test]
fn test_gaussian_peak_recovers_parameters() {
    init_logger();
    let truth = [4.0, 0.5, 1.2, 0.3];

    let mut engine = FittingEngine::new(peak_data(7), peak_model().with_jacobian(gaussian_jacobian));
    engine.set_weight_mode(WeightMode::Absolute).unwrap();
    let (popt, pcov) = engine.fit().unwrap();

    for (i, &expected) in truth.iter().enumerate() {
        let stderr = pcov[[i, i]].sqrt();
        assert!(stderr > 0.0);
        assert!(
            (popt[i] - expected).abs() < 5.0 * stderr,
            "parameter {} = {} is more than 5 sigma from {}",
            i,
            popt[i],
            expected
        );
    }

    // with correct absolute errors Smin is chi-square distributed with dof 77
    let report = engine.report().unwrap();
    assert_eq!(report.dof, 77);
    assert!(report.smin > 40.0 && report.smin < 130.0, "Smin = {}", report.smin);
    assert!(report.model.contains("\namplitude * exp"));
}

#[test]
fn test_gaussian_numeric_and_analytic_jacobian_agree() {
    let mut numeric = FittingEngine::new(peak_data(11), peak_model());
    let mut analytic = FittingEngine::new(peak_data(11), peak_model().with_jacobian(gaussian_jacobian));

    let (popt_n, pcov_n) = numeric.fit().unwrap();
    let (popt_a, pcov_a) = analytic.fit().unwrap();

    for i in 0..4 {
        assert_relative_eq!(popt_n[i], popt_a[i], max_relative = 1e-5);
        assert_relative_eq!(pcov_n[[i, i]], pcov_a[[i, i]], max_relative = 1e-3);
    }
}

#[test]
fn test_gaussian_with_fixed_center_and_offset() {
    init_logger();
    let mut model = peak_model().with_jacobian(gaussian_jacobian);
    for (name, value) in [("center", 0.5), ("offset", 0.3)] {
        let param = model.parameter_mut(name).unwrap();
        param.set_value(value);
        param.set_fixed(true);
    }

    let mut engine = FittingEngine::new(peak_data(3), model);
    engine.set_weight_mode(WeightMode::Relative).unwrap();
    let (popt, pcov) = engine.fit().unwrap();

    assert_eq!(popt[1], 0.5);
    assert_eq!(popt[3], 0.3);
    for fixed in [1, 3] {
        assert!(pcov.row(fixed).iter().all(|&v| v == 0.0));
        assert!(pcov.column(fixed).iter().all(|&v| v == 0.0));
    }
    assert_relative_eq!(popt[0], 4.0, epsilon = 0.1);
    assert_relative_eq!(popt[2], 1.2, epsilon = 0.05);
    assert_eq!(engine.report().unwrap().dof, 79);

    let residuals = engine.residuals().unwrap().unwrap();
    assert_eq!(residuals.len(), 81);
    let rms = (residuals.mapv(|r| r * r).sum() / 81.0).sqrt();
    assert!(rms < 0.2, "rms residual {}", rms);
}

#[test]
fn test_exponential_decay_over_subrange() {
    let x = Array1::linspace(0.0, 10.0, 60);
    let truth = x.mapv(|x: f64| 5.0 * (-0.4 * x).exp() + 0.5);
    let y = noisy(&truth, 0.05, 42);

    let model = FitModel::new(&["amplitude", "rate", "background"], |x, p| {
        x.mapv(|x| p[0] * (-p[1] * x).exp() + p[2])
    })
    .unwrap()
    .with_initial_values(&[1.0, 1.0, 0.0])
    .unwrap();

    let mut engine = FittingEngine::new(DataSet::new(x, y).unwrap(), model);
    engine.set_range(0.0, 8.0);
    let (popt, pcov) = engine.fit().unwrap();

    let report = engine.report().unwrap();
    assert_eq!(report.n_points, engine.data().count());
    assert!(report.t95 > 1.9 && report.t95 < 2.1);

    // 95% confidence intervals should cover the true values
    for (i, &expected) in [5.0, 0.4, 0.5].iter().enumerate() {
        let half_width = 2.0 * report.t95 * pcov[[i, i]].sqrt();
        assert!(
            (popt[i] - expected).abs() < half_width,
            "parameter {} = {} outside {} +/- {}",
            i,
            popt[i],
            expected,
            half_width
        );
    }

    let (curve_x, curve_y) = engine.fit_curve(None, None, None).unwrap().unwrap();
    assert_eq!(curve_x.len(), engine.settings().model_numpoints);
    assert_relative_eq!(curve_x[0], 0.0);
    assert_relative_eq!(curve_y[0], popt[0] + popt[2], epsilon = 1e-12);
}
