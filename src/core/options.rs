//! Trend filter options and configuration.

use thiserror::Error;

/// Highest total-variation order supported by the difference operator.
pub const MAX_TOTAL_VARIATION_ORDER: usize = 3;

/// How much the MCMC driver reports through `tracing` while it runs.
///
/// Levels are ordered: each level also emits everything the levels below it emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Only a convergence failure is reported.
    #[default]
    Quiet,
    /// Report every restarted iteration.
    Restarts,
    /// Report the start of every iteration.
    Iterations,
    /// Report every single parameter draw.
    Parameters,
}

/// Configuration options for the Bayesian trend filter.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Order of the differences whose sparsity is penalized (0 to 3, default: 2).
    pub total_variation_order: usize,
    /// Shape hyper-parameter of the gamma prior on `lambda2` (default: 0.1).
    pub alpha: f64,
    /// Rate hyper-parameter of the gamma prior on `lambda2` (default: 0.1).
    pub rho: f64,
    /// Number of Gibbs sweeps to run (default: 100).
    pub number_simulations: usize,
    /// Number of initial sweeps discarded from posterior means (default: 50).
    pub burn: usize,
    /// Number of times a single iteration may be retried after a numerical failure (default: 5).
    pub max_restart: usize,
    /// Logging verbosity of the driver (default: quiet).
    pub verbosity: Verbosity,
    /// Seed of the random number generator. `None` draws a seed from entropy.
    pub seed: Option<u64>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            total_variation_order: 2,
            alpha: 0.1,
            rho: 0.1,
            number_simulations: 100,
            burn: 50,
            max_restart: 5,
            verbosity: Verbosity::Quiet,
            seed: None,
        }
    }
}

/// Errors that can occur when validating filter options.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptionsError {
    #[error("total variation order must be at most {max}, got {got}")]
    InvalidOrder { max: usize, got: usize },
    #[error("alpha must be positive and finite, got {0}")]
    InvalidAlpha(f64),
    #[error("rho must be positive and finite, got {0}")]
    InvalidRho(f64),
    #[error("number_simulations must be at least 1, got {0}")]
    InvalidNumberSimulations(usize),
    #[error("burn ({burn}) must be smaller than number_simulations ({number_simulations})")]
    BurnTooLarge {
        burn: usize,
        number_simulations: usize,
    },
}

impl FilterOptions {
    /// Create a new builder for filter options.
    pub fn builder() -> FilterOptionsBuilder {
        FilterOptionsBuilder::default()
    }

    /// Create default options for an L1 trend filter of the given order.
    pub fn l1(total_variation_order: usize) -> Self {
        Self {
            total_variation_order,
            ..Default::default()
        }
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<(), OptionsError> {
        self.validate_model()?;
        if self.number_simulations < 1 {
            return Err(OptionsError::InvalidNumberSimulations(
                self.number_simulations,
            ));
        }
        if self.burn >= self.number_simulations {
            return Err(OptionsError::BurnTooLarge {
                burn: self.burn,
                number_simulations: self.number_simulations,
            });
        }
        Ok(())
    }

    /// Validate only the model hyper-parameters (order, alpha, rho).
    pub fn validate_model(&self) -> Result<(), OptionsError> {
        if self.total_variation_order > MAX_TOTAL_VARIATION_ORDER {
            return Err(OptionsError::InvalidOrder {
                max: MAX_TOTAL_VARIATION_ORDER,
                got: self.total_variation_order,
            });
        }
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(OptionsError::InvalidAlpha(self.alpha));
        }
        if !(self.rho > 0.0 && self.rho.is_finite()) {
            return Err(OptionsError::InvalidRho(self.rho));
        }
        Ok(())
    }
}

/// Builder for `FilterOptions`.
#[derive(Debug, Clone, Default)]
pub struct FilterOptionsBuilder {
    options: FilterOptions,
}

impl FilterOptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the order of the penalized differences.
    pub fn total_variation_order(mut self, order: usize) -> Self {
        self.options.total_variation_order = order;
        self
    }

    /// Set the prior shape of the global shrinkage.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.options.alpha = alpha;
        self
    }

    /// Set the prior rate of the global shrinkage.
    pub fn rho(mut self, rho: f64) -> Self {
        self.options.rho = rho;
        self
    }

    /// Set the number of Gibbs sweeps.
    pub fn number_simulations(mut self, n: usize) -> Self {
        self.options.number_simulations = n;
        self
    }

    /// Set the number of burn-in sweeps.
    pub fn burn(mut self, burn: usize) -> Self {
        self.options.burn = burn;
        self
    }

    /// Set the per-iteration restart budget.
    pub fn max_restart(mut self, max_restart: usize) -> Self {
        self.options.max_restart = max_restart;
        self
    }

    /// Set the logging verbosity.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.options.verbosity = verbosity;
        self
    }

    /// Seed the random number generator for reproducible chains.
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Build and validate the options.
    pub fn build(self) -> Result<FilterOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Build the options without validation.
    pub fn build_unchecked(self) -> FilterOptions {
        self.options
    }
}
