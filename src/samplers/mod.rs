//! Gibbs samplers implementing conditional posterior draws.

mod l1;
mod registry;
mod traits;

pub use l1::{L1Sampler, LAMBDA2, OMEGA, SIGMA2, TREND};
pub use registry::{SamplerConstructor, SamplerKind, SamplerRegistry};
pub use traits::{DistributionParameters, NumericalError, Sampler, SamplerError};
