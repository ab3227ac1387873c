//! Tests for fitting with fixed parameters.

use crate::test_helpers::{init_logger, line_x, line_y, line_yerr};
use curvefit_rs::reduction::{fit_with_fixed, ParameterPartition};
use curvefit_rs::{curve_fit, LmConfig, SolverError};
use ndarray::{array, Array1, Array2};

fn cubic(x: &Array1<f64>, p: &[f64]) -> Array1<f64> {
    x.mapv(|x| p[0] + p[1] * x + p[2] * x * x + p[3] * x * x * x)
}

fn cubic_jacobian(x: &Array1<f64>, _p: &[f64]) -> Array2<f64> {
    Array2::from_shape_fn((x.len(), 4), |(i, j)| x[i].powi(j as i32))
}

fn cubic_data() -> (Array1<f64>, Array1<f64>) {
    let x = Array1::linspace(-2.0, 2.0, 12);
    let y = x.mapv(|x: f64| 0.5 - 1.5 * x + 0.25 * x * x + 0.8 * x.powi(3) + 0.05 * (7.0 * x).sin());
    (x, y)
}

fn line(x: &Array1<f64>, p: &[f64]) -> Array1<f64> {
    x.mapv(|x| p[0] * x + p[1])
}

#[test]
fn test_all_free_matches_direct_fit() {
    init_logger();
    let (x, y) = (line_x(), line_y());
    let sigma = line_yerr();

    for absolute_sigma in [false, true] {
        let reduced = fit_with_fixed(
            &line,
            None,
            &x,
            &y,
            Some(&sigma),
            absolute_sigma,
            &[1.0, 1.0],
            &[false, false],
            &LmConfig::default(),
        )
        .unwrap();
        let (popt, pcov) = curve_fit(&line, &x, &y, array![1.0, 1.0], Some(&sigma), absolute_sigma, None).unwrap();

        assert_eq!(reduced.popt, popt);
        assert_eq!(reduced.pcov, pcov);
    }
}

#[test]
fn test_all_free_matches_direct_fit_with_jacobian() {
    let (x, y) = cubic_data();
    let p0 = [1.0, 1.0, 1.0, 1.0];
    let reduced = fit_with_fixed(
        &cubic,
        Some(&cubic_jacobian),
        &x,
        &y,
        None,
        false,
        &p0,
        &[false; 4],
        &LmConfig::default(),
    )
    .unwrap();
    let (popt, pcov) = curve_fit(&cubic, &x, &y, Array1::from_vec(p0.to_vec()), None, false, Some(&cubic_jacobian)).unwrap();

    assert_eq!(reduced.popt, popt);
    assert_eq!(reduced.pcov, pcov);
}

#[test]
fn test_every_fixed_subset_is_reassembled() {
    init_logger();
    let (x, y) = cubic_data();
    let p0 = [0.3, -1.0, 0.7, 0.9];

    // every combination that leaves at least one parameter free
    for bits in 0..15u32 {
        let fixed: Vec<bool> = (0..4).map(|i| bits & (1 << i) != 0).collect();
        for jacobian in [None, Some(&cubic_jacobian as &curvefit_rs::JacobianFn<'_>)] {
            let result = fit_with_fixed(&cubic, jacobian, &x, &y, None, false, &p0, &fixed, &LmConfig::default())
                .unwrap_or_else(|e| panic!("fit failed for fixed = {:?}: {}", fixed, e));

            assert_eq!(result.popt.len(), 4);
            assert_eq!(result.pcov.dim(), (4, 4));
            for i in (0..4).filter(|&i| fixed[i]) {
                assert_eq!(result.popt[i], p0[i], "fixed value moved for {:?}", fixed);
                assert!(result.pcov.row(i).iter().all(|&v| v == 0.0));
                assert!(result.pcov.column(i).iter().all(|&v| v == 0.0));
            }
            for i in (0..4).filter(|&i| !fixed[i]) {
                assert!(result.pcov[[i, i]] > 0.0, "free variance not positive for {:?}", fixed);
            }
        }
    }
}

#[test]
fn test_fixed_parameters_match_hand_reduced_model() {
    // holding p1 and p3 of the cubic fixed is the same as fitting the
    // two-parameter model with those terms folded into the function
    let (x, y) = cubic_data();
    let p0 = [0.0, -1.5, 0.0, 0.8];
    let result = fit_with_fixed(
        &cubic,
        None,
        &x,
        &y,
        None,
        false,
        &p0,
        &[false, true, false, true],
        &LmConfig::default(),
    )
    .unwrap();

    let folded = |x: &Array1<f64>, p: &[f64]| x.mapv(|x| p[0] - 1.5 * x + p[1] * x * x + 0.8 * x * x * x);
    let (popt, pcov) = curve_fit(&folded, &x, &y, array![0.0, 0.0], None, false, None).unwrap();

    approx::assert_relative_eq!(result.popt[0], popt[0], epsilon = 1e-6);
    approx::assert_relative_eq!(result.popt[2], popt[1], epsilon = 1e-6);
    approx::assert_relative_eq!(result.pcov[[0, 0]], pcov[[0, 0]], epsilon = 1e-9);
    approx::assert_relative_eq!(result.pcov[[0, 2]], pcov[[0, 1]], epsilon = 1e-9);
    approx::assert_relative_eq!(result.pcov[[2, 2]], pcov[[1, 1]], epsilon = 1e-9);
}

#[test]
fn test_reduced_jacobian_sees_full_parameters() {
    // the Jacobian must be called with the fixed value in place
    let x = line_x();
    let y = line_y();
    let jacobian = |x: &Array1<f64>, p: &[f64]| {
        assert_eq!(p.len(), 2);
        assert_eq!(p[1], -5.0);
        let mut jac = Array2::<f64>::ones((x.len(), 2));
        jac.column_mut(0).assign(x);
        jac
    };

    let result = fit_with_fixed(
        &line,
        Some(&jacobian),
        &x,
        &y,
        None,
        false,
        &[1.0, -5.0],
        &[false, true],
        &LmConfig::default(),
    )
    .unwrap();
    assert_eq!(result.popt[1], -5.0);
}

#[test]
fn test_jacobian_shape_errors_reach_the_caller() {
    let x = line_x();
    let y = line_y();
    let wide = |x: &Array1<f64>, _p: &[f64]| Array2::<f64>::ones((x.len(), 3));

    let err = fit_with_fixed(
        &line,
        Some(&wide),
        &x,
        &y,
        None,
        false,
        &[1.0, -5.0],
        &[false, true],
        &LmConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SolverError::InvalidInput(_)));
}

#[test]
fn test_partition_round_trip() {
    let partition = ParameterPartition::from_flags(&[true, false, false, true]);
    let template = [9.0, 0.0, 0.0, 8.0];
    let popt = partition.reassemble_params(&array![1.0, 2.0], &template);
    assert_eq!(popt, array![9.0, 1.0, 2.0, 8.0]);
    assert_eq!(partition.select_free(popt.as_slice().unwrap()), array![1.0, 2.0]);
}

#[test]
fn test_model_borrowing_local_state() {
    // the model reads its basis from a local table instead of owning it
    let (x, y) = cubic_data();
    let powers = vec![0, 1, 2, 3];
    let basis = |x: &Array1<f64>, p: &[f64]| {
        x.mapv(|x| powers.iter().zip(p).map(|(&k, c)| c * x.powi(k)).sum::<f64>())
    };
    let basis_jacobian =
        |x: &Array1<f64>, _p: &[f64]| Array2::from_shape_fn((x.len(), powers.len()), |(i, j)| x[i].powi(powers[j]));

    let fixed = [false, false, true, false];
    let p0 = [0.3, -1.0, 0.25, 0.9];
    let borrowed = fit_with_fixed(&basis, Some(&basis_jacobian), &x, &y, None, false, &p0, &fixed, &LmConfig::default())
        .unwrap();
    let owned = fit_with_fixed(&cubic, Some(&cubic_jacobian), &x, &y, None, false, &p0, &fixed, &LmConfig::default())
        .unwrap();

    assert_eq!(borrowed.popt[2], 0.25);
    for i in 0..4 {
        assert!((borrowed.popt[i] - owned.popt[i]).abs() < 1e-8);
    }
}
