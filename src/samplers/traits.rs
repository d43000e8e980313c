//! Core traits for Gibbs samplers.

use crate::core::{HistoryError, OptionsError, ParameterError, ParameterSet, SimulationHistory};
use crate::utils::OperatorError;
use faer::linalg::solvers::{DenseSolveCore, Llt};
use faer::{Col, Mat};
use rand::RngCore;
use thiserror::Error;

/// Numerical failures of a single draw.
///
/// These are transient: the driver discards the current iteration and retries it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericalError {
    #[error("precision matrix of `{0}` is not positive definite")]
    NotPositiveDefinite(String),

    #[error("invalid {argument} for `{parameter}`: {value}")]
    InvalidArgument {
        parameter: String,
        argument: &'static str,
        value: f64,
    },

    #[error("difference term {index} is numerically zero ({value:e})")]
    DegenerateDifference { index: usize, value: f64 },

    #[error("draw of `{0}` is not finite")]
    NonFinite(String),
}

/// Errors that can occur while building or driving a sampler.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamplerError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("numerical error: {0}")]
    Numerical(#[from] NumericalError),

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("observation {0} is not finite")]
    NonFiniteData(usize),

    #[error("unknown sampler `{0}`")]
    UnknownStrategy(String),
}

impl SamplerError {
    /// True for failures that a retry of the iteration may clear.
    pub fn is_numerical(&self) -> bool {
        matches!(self, SamplerError::Numerical(_))
    }
}

/// Arguments of a conditional posterior, given the current values of all other parameters.
#[derive(Debug, Clone)]
pub enum DistributionParameters {
    /// `N(mean, scale · A⁻¹)` where `A = L Lᵀ` is held as its Cholesky factor.
    MultivariateNormal {
        mean: Col<f64>,
        precision: Llt<f64>,
        scale: f64,
    },
    /// Inverse-gamma with density proportional to `x^(-shape-1) exp(-scale / x)`.
    InverseGamma { shape: f64, scale: f64 },
    /// Gamma with density proportional to `x^(shape-1) exp(-rate · x)`.
    Gamma { shape: f64, rate: f64 },
    /// Independent inverse-Gaussian components sharing one shape.
    InverseGaussian { means: Col<f64>, shape: f64 },
}

impl DistributionParameters {
    /// Covariance of a multivariate normal conditional, materialized on demand.
    pub fn covariance(&self) -> Option<Mat<f64>> {
        match self {
            DistributionParameters::MultivariateNormal {
                precision, scale, ..
            } => {
                let inverse = precision.inverse();
                Some(Mat::from_fn(inverse.nrows(), inverse.ncols(), |i, j| {
                    *scale * inverse[(i, j)]
                }))
            }
            _ => None,
        }
    }

    /// True when every numeric argument is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            DistributionParameters::MultivariateNormal { mean, scale, .. } => {
                scale.is_finite() && mean.is_all_finite()
            }
            DistributionParameters::InverseGamma { shape, scale } => {
                shape.is_finite() && scale.is_finite()
            }
            DistributionParameters::Gamma { shape, rate } => shape.is_finite() && rate.is_finite(),
            DistributionParameters::InverseGaussian { means, shape } => {
                shape.is_finite() && means.is_all_finite()
            }
        }
    }
}

/// A model whose unknowns are updated one at a time from their conditional posteriors.
///
/// The sampler owns its [`ParameterSet`]; the driver seeds it with
/// [`Sampler::initial_value`] and commits every [`Sampler::generate`] draw back into it.
pub trait Sampler {
    /// (Re)build the parameter set. Every value is left unset.
    fn define_parameters(&mut self) -> Result<(), SamplerError>;

    /// The parameters, in update order.
    fn parameters(&self) -> &ParameterSet;

    /// Mutable access for committing draws.
    fn parameters_mut(&mut self) -> &mut ParameterSet;

    /// Deterministic starting value of a parameter, shaped as the parameter.
    fn initial_value(&self, name: &str) -> Result<Mat<f64>, SamplerError>;

    /// Arguments of the conditional posterior of `name` at the current state.
    fn distribution_parameters(&self, name: &str)
        -> Result<DistributionParameters, SamplerError>;

    /// Draw a new value of `name` from its conditional posterior.
    ///
    /// The sampler state is not modified; the caller commits the draw.
    fn generate(&self, name: &str, rng: &mut dyn RngCore) -> Result<Mat<f64>, SamplerError>;

    /// Posterior mean of `name` over the simulations with index `>= burn`.
    fn output(
        &self,
        history: &SimulationHistory,
        burn: usize,
        name: &str,
    ) -> Result<Mat<f64>, SamplerError> {
        self.parameters().get(name)?;
        Ok(history.posterior_mean(name, burn)?)
    }
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn define_parameters(&mut self) -> Result<(), SamplerError> {
        (**self).define_parameters()
    }

    fn parameters(&self) -> &ParameterSet {
        (**self).parameters()
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        (**self).parameters_mut()
    }

    fn initial_value(&self, name: &str) -> Result<Mat<f64>, SamplerError> {
        (**self).initial_value(name)
    }

    fn distribution_parameters(
        &self,
        name: &str,
    ) -> Result<DistributionParameters, SamplerError> {
        (**self).distribution_parameters(name)
    }

    fn generate(&self, name: &str, rng: &mut dyn RngCore) -> Result<Mat<f64>, SamplerError> {
        (**self).generate(name, rng)
    }

    fn output(
        &self,
        history: &SimulationHistory,
        burn: usize,
        name: &str,
    ) -> Result<Mat<f64>, SamplerError> {
        (**self).output(history, burn, name)
    }
}
