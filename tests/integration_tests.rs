use approx::assert_abs_diff_eq;
use logit_irls::design::polynomial_design;
use logit_irls::family::Binomial;
use logit_irls::simulate::{simulate_logistic, simulate_separable};
use logit_irls::{
    fit_logistic_irls, irls_update, ConvergenceNorm, Divergence, FitResult, IrlsError, IrlsOptions,
    Precondition, StopReason,
};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn log_likelihood(x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
    x.dot(beta)
        .iter()
        .zip(y.iter())
        .map(|(&eta, &yi)| yi * eta - (1.0 + eta.exp()).ln())
        .sum()
}

fn fit_default(x: &Array2<f64>, y: &Array1<f64>) -> FitResult {
    fit_logistic_irls(x, y, &IrlsOptions::default()).unwrap()
}

#[test]
fn test_score_equations_hold_at_estimate() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let data = simulate_logistic(&mut rng, 1000, &[-1.0, 2.0]);
    let fit = fit_default(&data.design, &data.y);
    assert!(fit.converged);

    // X'(y - μ̂) = 0 characterizes the MLE of a canonical-link GLM
    let residual = &data.y - &fit.fitted_values;
    let score = data.design.t().dot(&residual);
    for s in score.iter() {
        assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_estimate_is_a_local_maximum() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let data = simulate_logistic(&mut rng, 500, &[0.5, -1.5]);
    let fit = fit_default(&data.design, &data.y);
    let best = log_likelihood(&data.design, &data.y, &fit.coefficients);
    assert_abs_diff_eq!(best, fit.log_likelihood, epsilon = 1e-8);

    for j in 0..2 {
        for &delta in &[1e-3, -1e-3, 1e-1, -1e-1] {
            let mut probe = fit.coefficients.clone();
            probe[j] += delta;
            assert!(log_likelihood(&data.design, &data.y, &probe) < best);
        }
    }
}

#[test]
fn test_large_sample_recovers_truth() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let data = simulate_logistic(&mut rng, 20_000, &[-1.0, 2.0]);
    let fit = fit_default(&data.design, &data.y);
    assert!(fit.converged);
    assert_abs_diff_eq!(fit.coefficients[0], -1.0, epsilon = 0.25);
    assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 0.25);
}

#[test]
fn test_fixed_point_after_convergence() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let data = simulate_logistic(&mut rng, 400, &[-2.0, 4.0]);
    let options = IrlsOptions::default();
    let fit = fit_logistic_irls(&data.design, &data.y, &options).unwrap();
    assert!(fit.converged);

    let next = irls_update(&Binomial, &data.design, &data.y, &fit.coefficients).unwrap();
    let change = ConvergenceNorm::MaxAbs.distance(&next, &fit.coefficients);
    assert!(change < options.tolerance, "change {} after convergence", change);
}

#[test]
fn test_log_likelihood_trace_is_non_decreasing() {
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let data = simulate_logistic(&mut rng, 500, &[-1.0, 2.0]);
    let fit = fit_default(&data.design, &data.y);

    assert!(fit.log_likelihood_trace.len() >= 2);
    for pair in fit.log_likelihood_trace.windows(2) {
        let slack = 1e-9 * (1.0 + pair[0].abs());
        assert!(
            pair[1] >= pair[0] - slack,
            "log-likelihood decreased: {:?}",
            fit.log_likelihood_trace
        );
    }
}

#[test]
fn test_different_starts_reach_same_fixed_point() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let data = simulate_logistic(&mut rng, 600, &[-1.0, 3.0]);

    let starts = [vec![0.0, 0.0], vec![0.05, -0.03], vec![-0.5, 1.0]];
    let fits: Vec<FitResult> = starts
        .iter()
        .map(|s| {
            let options = IrlsOptions::default().initial_coefficients(s.clone());
            fit_logistic_irls(&data.design, &data.y, &options).unwrap()
        })
        .collect();

    for fit in &fits[1..] {
        assert!(fit.converged);
        assert_abs_diff_eq!(fit.coefficients[0], fits[0].coefficients[0], epsilon = 1e-7);
        assert_abs_diff_eq!(fit.coefficients[1], fits[0].coefficients[1], epsilon = 1e-7);
    }
}

#[test]
fn test_separable_data_reports_divergence() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let data = simulate_separable(&mut rng, 300, 0.5);

    let err = fit_logistic_irls(&data.design, &data.y, &IrlsOptions::default()).unwrap_err();
    assert!(
        matches!(err, IrlsError::NumericalDivergence { .. }),
        "expected divergence, got {:?}",
        err
    );
    assert!(err.iteration().is_some());
}

#[test]
fn test_separable_data_never_returns_non_finite() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let data = simulate_separable(&mut rng, 100, 0.3);
    for max_iterations in [1, 2, 5, 10, 50] {
        let options = IrlsOptions::default().max_iterations(max_iterations);
        if let Ok(fit) = fit_logistic_irls(&data.design, &data.y, &options) {
            assert!(!fit.converged);
            assert!(fit.coefficients.iter().all(|b| b.is_finite()));
            assert!(fit.fitted_values.iter().all(|m| m.is_finite()));
        }
    }
}

#[test]
fn test_row_count_mismatch_rejected() {
    let x = Array2::from_shape_fn((300, 2), |(i, j)| if j == 0 { 1.0 } else { i as f64 / 300.0 });
    let y = Array1::from_shape_fn(299, |i| (i % 2) as f64);

    let err = fit_logistic_irls(&x, &y, &IrlsOptions::default()).unwrap_err();
    assert_eq!(
        err,
        IrlsError::Precondition(Precondition::DimensionMismatch {
            rows: 300,
            responses: 299
        })
    );
    assert!(err.is_precondition());
    assert_eq!(err.iteration(), None);
}

#[test]
fn test_simulated_logistic_scenario() {
    // 300 sorted uniform x, logit P(y=1) = -8 + 16x, start at (-5, 10)
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let data = simulate_logistic(&mut rng, 300, &[-8.0, 16.0]);
    let options = IrlsOptions::default().initial_coefficients(vec![-5.0, 10.0]);

    let fit = fit_logistic_irls(&data.design, &data.y, &options).unwrap();
    assert!(fit.converged);
    assert_eq!(fit.stop_reason, StopReason::Converged);
    assert!(fit.iterations <= 100);

    // With n = 300 the slope's standard error is around 2, so compare
    // against the truth in units of the estimated standard error.
    let summary = fit.summarize(&data.design, &data.y).unwrap();
    for (c, truth) in summary.coefficients.iter().zip([-8.0, 16.0]) {
        let z = (c.estimate - truth) / c.std_error;
        assert!(z.abs() < 4.0, "estimate {} vs {} (se {})", c.estimate, truth, c.std_error);
    }
}

#[test]
fn test_early_stop_matches_fixed_budget_estimate() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let data = simulate_logistic(&mut rng, 300, &[-8.0, 16.0]);

    let early = fit_logistic_irls(
        &data.design,
        &data.y,
        &IrlsOptions::default().initial_coefficients(vec![-5.0, 10.0]),
    )
    .unwrap();

    // Only an exactly repeated β can stop this fit before the budget runs out
    let fixed = fit_logistic_irls(
        &data.design,
        &data.y,
        &IrlsOptions::default()
            .initial_coefficients(vec![-5.0, 10.0])
            .tolerance(f64::MIN_POSITIVE),
    )
    .unwrap();

    assert!(early.converged);
    assert!(early.iterations < 100);
    // A step of exactly zero still counts as converged under f64::MIN_POSITIVE
    if fixed.converged {
        assert_eq!(fixed.stop_reason, StopReason::Converged);
        assert!(fixed.iterations >= early.iterations);
    } else {
        assert_eq!(fixed.stop_reason, StopReason::IterationLimit);
        assert_eq!(fixed.iterations, 100);
    }
    assert_abs_diff_eq!(early.coefficients[0], fixed.coefficients[0], epsilon = 1e-7);
    assert_abs_diff_eq!(early.coefficients[1], fixed.coefficients[1], epsilon = 1e-7);
}

#[test]
fn test_quadratic_predictor() {
    let mut rng = ChaCha8Rng::seed_from_u64(123);
    let data = simulate_logistic(&mut rng, 5_000, &[-2.0, 1.0, 3.0]);
    let fit = fit_default(&data.design, &data.y);
    assert!(fit.converged);
    assert_eq!(fit.coefficients.len(), 3);

    let probs = fit.predict(&polynomial_design(data.x.view(), 2)).unwrap();
    for (p, q) in probs.iter().zip(fit.fitted_values.iter()) {
        assert_abs_diff_eq!(*p, *q, epsilon = 1e-12);
    }
}

#[test]
fn test_euclidean_norm_agrees_with_max_abs() {
    let mut rng = ChaCha8Rng::seed_from_u64(55);
    let data = simulate_logistic(&mut rng, 300, &[1.0, -2.0]);
    let a = fit_default(&data.design, &data.y);
    let b = fit_logistic_irls(
        &data.design,
        &data.y,
        &IrlsOptions::default().norm(ConvergenceNorm::Euclidean),
    )
    .unwrap();
    assert_abs_diff_eq!(a.coefficients[0], b.coefficients[0], epsilon = 1e-7);
    assert_abs_diff_eq!(a.coefficients[1], b.coefficients[1], epsilon = 1e-7);
}

#[test]
fn test_concurrent_fits_are_independent() {
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let data = simulate_logistic(&mut rng, 800, &[-1.0, 2.0]);
    let reference = fit_default(&data.design, &data.y);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|k| {
                let data = &data;
                scope.spawn(move || {
                    let options = IrlsOptions::default().parallel(k % 2 == 0);
                    fit_logistic_irls(&data.design, &data.y, &options).unwrap()
                })
            })
            .collect();
        for handle in handles {
            let fit = handle.join().unwrap();
            assert_eq!(fit.iterations, reference.iterations);
            assert_abs_diff_eq!(fit.coefficients[0], reference.coefficients[0], epsilon = 1e-12);
            assert_abs_diff_eq!(fit.coefficients[1], reference.coefficients[1], epsilon = 1e-12);
        }
    });
}

#[test]
fn test_saturation_cause_names_observation() {
    let x = Array2::from_shape_fn((4, 2), |(i, j)| if j == 0 { 1.0 } else { i as f64 });
    let y = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
    let options = IrlsOptions::default().initial_coefficients(vec![0.0, 20.0]);

    // η = 20i: observations 2 and 3 are past the saturation threshold
    let err = fit_logistic_irls(&x, &y, &options).unwrap_err();
    assert_eq!(
        err,
        IrlsError::NumericalDivergence {
            iteration: 1,
            cause: Divergence::SaturatedProbability { observation: 2 }
        }
    );
}
