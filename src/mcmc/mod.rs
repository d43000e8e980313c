//! Markov chain Monte Carlo driver.

mod driver;

pub use driver::{ChainState, Mcmc, McmcError};
