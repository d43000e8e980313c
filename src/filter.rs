//! Trend extraction entry point.

use faer::Col;

use crate::core::{FilterOptions, FilterOptionsBuilder, SimulationHistory, Verbosity};
use crate::mcmc::{Mcmc, McmcError};
use crate::samplers::{SamplerRegistry, LAMBDA2, OMEGA, SIGMA2, TREND};
use crate::utils::mat_to_col;

/// Posterior summary of a filtering run.
#[derive(Debug, Clone)]
pub struct FilteredTrend {
    /// Posterior mean of the trend.
    pub trend: Col<f64>,
    /// Observations minus the trend.
    pub residuals: Col<f64>,
    /// Posterior mean of the residual variance.
    pub sigma2: f64,
    /// Posterior mean of the global shrinkage.
    pub lambda2: f64,
    /// Posterior mean of the local shrinkage weights.
    pub omega: Col<f64>,
    /// Sweeps discarded from the means.
    pub burn: usize,
    /// Restarted iterations over the run.
    pub restarts: usize,
    /// Every draw of the chain.
    pub history: SimulationHistory,
}

impl FilteredTrend {
    /// Length of the filtered series.
    pub fn len(&self) -> usize {
        self.trend.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.nrows() == 0
    }

    /// True when every posterior mean is finite.
    pub fn is_finite(&self) -> bool {
        let finite = |c: &Col<f64>| (0..c.nrows()).all(|i| c[i].is_finite());
        finite(&self.trend)
            && finite(&self.omega)
            && self.sigma2.is_finite()
            && self.lambda2.is_finite()
    }
}

/// Bayesian trend filter.
///
/// Selects a sampler by identifier, runs the Gibbs chain on a series and
/// summarizes it by posterior means.
///
/// # Example
///
/// ```rust,ignore
/// use trendfilter::prelude::*;
///
/// let fitted = TrendFilter::builder()
///     .total_variation_order(2)
///     .number_simulations(200)
///     .burn(100)
///     .seed(7)
///     .build()
///     .filter(&y)?;
///
/// println!("sigma2 = {}", fitted.sigma2);
/// ```
#[derive(Debug, Clone)]
pub struct TrendFilter {
    options: FilterOptions,
    method: String,
    registry: SamplerRegistry,
}

impl Default for TrendFilter {
    fn default() -> Self {
        Self::new(FilterOptions::default())
    }
}

impl TrendFilter {
    /// Create an L1 trend filter with the given options.
    pub fn new(options: FilterOptions) -> Self {
        Self {
            options,
            method: "L1".to_string(),
            registry: SamplerRegistry::default(),
        }
    }

    pub fn builder() -> TrendFilterBuilder {
        TrendFilterBuilder::default()
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Identifier of the sampler used by [`filter`](TrendFilter::filter).
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn registry(&self) -> &SamplerRegistry {
        &self.registry
    }

    /// Filter `data`.
    ///
    /// Options, data and sampler identifier are checked before any sweep runs.
    pub fn filter(&self, data: &Col<f64>) -> Result<FilteredTrend, McmcError> {
        self.options.validate()?;
        let sampler = self.registry.create(&self.method, data, &self.options)?;

        let mut mcmc = match self.options.seed {
            Some(seed) => Mcmc::with_seed(sampler, seed),
            None => Mcmc::new(sampler),
        };
        mcmc.run(
            self.options.number_simulations,
            self.options.max_restart,
            self.options.verbosity,
        )?;

        let burn = self.options.burn;
        let trend = mat_to_col(&mcmc.output(burn, TREND)?);
        let sigma2 = mcmc.output(burn, SIGMA2)?[(0, 0)];
        let lambda2 = mcmc.output(burn, LAMBDA2)?[(0, 0)];
        let omega = mat_to_col(&mcmc.output(burn, OMEGA)?);
        let residuals = Col::from_fn(data.nrows(), |i| data[i] - trend[i]);
        let restarts = mcmc.total_restarts();

        let (_, history) = mcmc.into_parts();
        let history = history.ok_or(McmcError::NotRun)?;

        Ok(FilteredTrend {
            trend,
            residuals,
            sigma2,
            lambda2,
            omega,
            burn,
            restarts,
            history,
        })
    }
}

/// Builder for `TrendFilter`.
#[derive(Debug, Clone)]
pub struct TrendFilterBuilder {
    builder: FilterOptionsBuilder,
    method: String,
    registry: SamplerRegistry,
}

impl Default for TrendFilterBuilder {
    fn default() -> Self {
        Self {
            builder: FilterOptionsBuilder::default(),
            method: "L1".to_string(),
            registry: SamplerRegistry::default(),
        }
    }
}

impl TrendFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the sampler by registry identifier.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Use a custom registry.
    pub fn registry(mut self, registry: SamplerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn total_variation_order(mut self, order: usize) -> Self {
        self.builder = self.builder.total_variation_order(order);
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.builder = self.builder.alpha(alpha);
        self
    }

    pub fn rho(mut self, rho: f64) -> Self {
        self.builder = self.builder.rho(rho);
        self
    }

    pub fn number_simulations(mut self, n: usize) -> Self {
        self.builder = self.builder.number_simulations(n);
        self
    }

    pub fn burn(mut self, burn: usize) -> Self {
        self.builder = self.builder.burn(burn);
        self
    }

    pub fn max_restart(mut self, max_restart: usize) -> Self {
        self.builder = self.builder.max_restart(max_restart);
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.builder = self.builder.verbosity(verbosity);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.builder = self.builder.seed(seed);
        self
    }

    /// Build the filter. Options are validated when filtering.
    pub fn build(self) -> TrendFilter {
        TrendFilter {
            options: self.builder.build_unchecked(),
            method: self.method,
            registry: self.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionsError;
    use crate::samplers::SamplerError;

    fn series(n: usize) -> Col<f64> {
        Col::from_fn(n, |i| 2.0 + (i as f64 / 5.0).cos() + 0.02 * i as f64)
    }

    #[test]
    fn test_builder_defaults() {
        let filter = TrendFilter::builder().build();
        assert_eq!(filter.method(), "L1");
        assert_eq!(filter.options().total_variation_order, 2);
        assert!(filter.registry().contains("L1Filter"));
    }

    #[test]
    fn test_filter_summary() {
        let y = series(50);
        let fitted = TrendFilter::builder()
            .number_simulations(30)
            .burn(10)
            .seed(99)
            .build()
            .filter(&y)
            .unwrap();

        assert_eq!(fitted.len(), 50);
        assert_eq!(fitted.omega.nrows(), 48);
        assert_eq!(fitted.burn, 10);
        assert!(fitted.is_finite());
        assert!(fitted.sigma2 > 0.0);
        assert!(fitted.lambda2 > 0.0);
        for i in 0..50 {
            assert!((fitted.residuals[i] - (y[i] - fitted.trend[i])).abs() < 1e-12);
        }
        assert_eq!(fitted.history.number_simulations(), 30);
    }

    #[test]
    fn test_filter_rejects_bad_burn() {
        let err = TrendFilter::builder()
            .number_simulations(10)
            .burn(10)
            .build()
            .filter(&series(20))
            .unwrap_err();
        assert!(matches!(
            err,
            McmcError::Options(OptionsError::BurnTooLarge { .. })
        ));
    }

    #[test]
    fn test_filter_rejects_unknown_method() {
        let err = TrendFilter::builder()
            .method("HodrickPrescott")
            .build()
            .filter(&series(20))
            .unwrap_err();
        assert_eq!(
            err,
            McmcError::Sampler(SamplerError::UnknownStrategy("HodrickPrescott".into()))
        );
    }
}
