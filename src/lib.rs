//! Bayesian L1 trend filtering.
//!
//! This library extracts a piecewise-polynomial trend from a noisy time series
//! by Gibbs sampling the posterior of a hierarchical model with a Laplace
//! (total variation) prior on the differences of the trend. The trend, the
//! residual variance and the global and local shrinkage are all estimated by
//! their posterior means.
//!
//! # Example
//!
//! ```rust,ignore
//! use trendfilter::prelude::*;
//!
//! // Filter a series with second-order (piecewise linear) total variation
//! let fitted = TrendFilter::builder()
//!     .total_variation_order(2)
//!     .number_simulations(100)
//!     .burn(50)
//!     .build()
//!     .filter(&y)?;
//!
//! // Posterior means
//! println!("sigma2 = {}", fitted.sigma2);
//! let trend = &fitted.trend;
//!
//! // Or drive the chain directly
//! let mut mcmc = Mcmc::with_seed(L1Sampler::new(&y, &FilterOptions::l1(1))?, 42);
//! mcmc.run(100, 5, Verbosity::Restarts)?;
//! let trend = mcmc.output(50, "trend")?;
//! ```

pub mod core;
pub mod filter;
pub mod mcmc;
pub mod samplers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        FilterOptions, FilterOptionsBuilder, OptionsError, Parameter, ParameterError,
        ParameterSet, PosteriorFamily, SimulationHistory, Trace, Verbosity,
    };
    pub use crate::filter::{FilteredTrend, TrendFilter, TrendFilterBuilder};
    pub use crate::mcmc::{ChainState, Mcmc, McmcError};
    pub use crate::samplers::{
        DistributionParameters, L1Sampler, NumericalError, Sampler, SamplerError, SamplerKind,
        SamplerRegistry,
    };
    pub use crate::utils::derivative_matrix;
}

pub use crate::core::{FilterOptions, FilterOptionsBuilder, SimulationHistory, Verbosity};
pub use crate::filter::{FilteredTrend, TrendFilter};
pub use crate::mcmc::{Mcmc, McmcError};
pub use crate::samplers::{L1Sampler, Sampler, SamplerError};
