//! End-to-end trend filtering tests.

mod common;

use approx::assert_relative_eq;
use faer::Col;
use trendfilter::prelude::*;

// ============================================================================
// Gamma(10) series of a year of daily observations
// ============================================================================

#[test]
fn test_filter_gamma_series() {
    let y = common::generate_gamma_series(365, 10.0, 2024);

    let fitted = TrendFilter::builder()
        .number_simulations(50)
        .burn(20)
        .max_restart(5)
        .seed(1)
        .build()
        .filter(&y)
        .expect("filter should converge");

    assert_eq!(fitted.len(), 365);
    assert_eq!(fitted.omega.nrows(), 363);
    assert!(fitted.is_finite());
    for i in 0..365 {
        assert!(fitted.trend[i].is_finite());
    }

    // the trend of iid Gamma(10, 1) data stays near the mean of 10
    let mean = (0..365).map(|i| fitted.trend[i]).sum::<f64>() / 365.0;
    assert!((mean - 10.0).abs() < 1.5, "mean trend = {mean}");
}

#[test]
fn test_mcmc_gamma_series() {
    let y = common::generate_gamma_series(365, 10.0, 7);
    let sampler = L1Sampler::new(&y, &FilterOptions::l1(2)).unwrap();
    let mut mcmc = Mcmc::with_seed(sampler, 3);
    mcmc.run(50, 5, Verbosity::Quiet).unwrap();

    let trend = mcmc.output(20, "trend").unwrap();
    assert_eq!((trend.nrows(), trend.ncols()), (365, 1));
    assert!((0..365).all(|i| trend[(i, 0)].is_finite()));

    let again = mcmc.output(20, "trend").unwrap();
    for i in 0..365 {
        assert_eq!(trend[(i, 0)], again[(i, 0)]);
    }
}

#[test]
fn test_filter_every_order() {
    let y = common::generate_gamma_series(120, 10.0, 11);
    for order in 0..=3 {
        let fitted = TrendFilter::builder()
            .total_variation_order(order)
            .number_simulations(30)
            .burn(10)
            .seed(5)
            .build()
            .filter(&y)
            .unwrap();
        assert_eq!(fitted.omega.nrows(), 120 - order);
        assert!(fitted.is_finite(), "order {order}");
    }
}

// ============================================================================
// Recovery of a known trend
// ============================================================================

#[test]
fn test_filter_recovers_kinked_trend() {
    let (y, truth) = common::generate_kinked_series(200, 0.5, 8);

    let fitted = TrendFilter::builder()
        .total_variation_order(2)
        .number_simulations(200)
        .burn(100)
        .seed(13)
        .build()
        .filter(&y)
        .unwrap();

    let rmse = |estimate: &Col<f64>| {
        ((0..200).map(|i| (estimate[i] - truth[i]).powi(2)).sum::<f64>() / 200.0).sqrt()
    };
    // smoothing beats the raw observations
    assert!(rmse(&fitted.trend) < rmse(&y));
    // the noise variance is 0.25
    assert!(
        fitted.sigma2 > 0.05 && fitted.sigma2 < 0.5,
        "sigma2 = {}",
        fitted.sigma2
    );
}

#[test]
fn test_noise_free_series_collapses_sigma2() {
    // with nothing left to explain the residual variance shrinks every sweep
    let y = Col::from_fn(300, |i| (0.05 * i as f64).sin());
    let fitted = TrendFilter::builder()
        .total_variation_order(2)
        .number_simulations(80)
        .burn(60)
        .seed(3)
        .build()
        .filter(&y)
        .unwrap();

    assert!(fitted.sigma2 < 1e-6, "sigma2 = {}", fitted.sigma2);
    for i in 0..300 {
        assert!(fitted.residuals[i].abs() < 1e-3);
    }
}

#[test]
fn test_filter_is_reproducible_with_seed() {
    let y = common::generate_gamma_series(80, 10.0, 9);
    let filter = TrendFilter::builder()
        .number_simulations(20)
        .burn(5)
        .seed(77)
        .build();

    let a = filter.filter(&y).unwrap();
    let b = filter.filter(&y).unwrap();
    for i in 0..80 {
        assert_eq!(a.trend[i], b.trend[i]);
    }
    assert_eq!(a.sigma2, b.sigma2);
}

#[test]
fn test_filtered_summary_matches_history() {
    let y = common::generate_gamma_series(60, 10.0, 10);
    let fitted = TrendFilter::builder()
        .number_simulations(25)
        .burn(5)
        .seed(4)
        .build()
        .filter(&y)
        .unwrap();

    let chain = fitted.history.trace("lambda2").unwrap().chain(0, 0);
    assert_eq!(chain.len(), 25);
    let expected = chain[5..].iter().sum::<f64>() / 20.0;
    assert_relative_eq!(fitted.lambda2, expected, epsilon = 1e-12);

    for i in 0..60 {
        assert_relative_eq!(
            fitted.residuals[i] + fitted.trend[i],
            y[i],
            epsilon = 1e-12
        );
    }
}

// ============================================================================
// Configuration errors fail before sampling
// ============================================================================

#[test]
fn test_configuration_errors() {
    let y = common::generate_gamma_series(30, 10.0, 12);

    let err = TrendFilter::builder()
        .total_variation_order(5)
        .build()
        .filter(&y)
        .unwrap_err();
    assert!(matches!(
        err,
        McmcError::Options(OptionsError::InvalidOrder { max: 3, got: 5 })
    ));

    let err = TrendFilter::builder()
        .number_simulations(20)
        .burn(25)
        .build()
        .filter(&y)
        .unwrap_err();
    assert!(matches!(
        err,
        McmcError::Options(OptionsError::BurnTooLarge { .. })
    ));

    let short = Col::from_fn(3, |i| i as f64);
    let err = TrendFilter::default().filter(&short).unwrap_err();
    assert!(matches!(
        err,
        McmcError::Sampler(SamplerError::InsufficientObservations { .. })
    ));

    let mut bad = y.clone();
    bad[7] = f64::INFINITY;
    let err = TrendFilter::default().filter(&bad).unwrap_err();
    assert_eq!(err, McmcError::Sampler(SamplerError::NonFiniteData(7)));
}

// ============================================================================
// Strategy selection
// ============================================================================

#[test]
fn test_method_identifiers() {
    let y = common::generate_gamma_series(40, 10.0, 13);
    for method in ["L1", "L1Filter"] {
        let fitted = TrendFilter::builder()
            .method(method)
            .number_simulations(10)
            .burn(2)
            .seed(1)
            .build()
            .filter(&y)
            .unwrap();
        assert_eq!(fitted.len(), 40);
    }

    let err = TrendFilter::builder()
        .method("l1")
        .build()
        .filter(&y)
        .unwrap_err();
    assert_eq!(
        err,
        McmcError::Sampler(SamplerError::UnknownStrategy("l1".into()))
    );
    assert!("l1".parse::<SamplerKind>().is_err());

    let err = TrendFilter::builder()
        .method("Kalman")
        .build()
        .filter(&y)
        .unwrap_err();
    assert_eq!(
        err,
        McmcError::Sampler(SamplerError::UnknownStrategy("Kalman".into()))
    );
}

#[test]
fn test_custom_registry() {
    fn first_order(
        data: &Col<f64>,
        options: &FilterOptions,
    ) -> Result<Box<dyn Sampler>, SamplerError> {
        let options = FilterOptions {
            total_variation_order: 1,
            ..options.clone()
        };
        Ok(Box::new(L1Sampler::new(data, &options)?))
    }

    let mut registry = SamplerRegistry::empty();
    registry.register("TV1", first_order);
    assert_eq!(registry.identifiers(), vec!["TV1"]);

    let y = common::generate_gamma_series(40, 10.0, 14);
    let fitted = TrendFilter::builder()
        .registry(registry)
        .method("TV1")
        .number_simulations(10)
        .burn(2)
        .seed(2)
        .build()
        .filter(&y)
        .unwrap();
    assert_eq!(fitted.omega.nrows(), 39);

    let kind: SamplerKind = "L1Filter".parse().unwrap();
    let sampler = kind.create(&y, &FilterOptions::l1(3)).unwrap();
    assert_eq!(sampler.parameters().get("omega").unwrap().shape(), (37, 1));
}
