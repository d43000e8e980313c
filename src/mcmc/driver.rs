//! Gibbs sampling driver.

use faer::Mat;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::core::{OptionsError, SimulationHistory, Verbosity};
use crate::samplers::{Sampler, SamplerError};

/// Errors surfaced by [`Mcmc::run`] and [`Mcmc::output`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum McmcError {
    #[error(
        "filter did not converge: iteration {iteration} still failing after {restarts} restarts ({cause})"
    )]
    ConvergenceFailed {
        iteration: usize,
        restarts: usize,
        cause: SamplerError,
    },

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),

    #[error("the chain has not been run")]
    NotRun,

    #[error("burn ({burn}) must be smaller than the number of simulations ({number_simulations})")]
    InvalidBurn {
        burn: usize,
        number_simulations: usize,
    },
}

/// Position of the driver in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainState {
    /// Allocating history and seeding initial values.
    #[default]
    Initializing,
    /// Drawing the parameter at this position in the hierarchy.
    SweepingParameter(usize),
    /// All parameters of the iteration are drawn.
    RecordingSample,
    /// A draw failed numerically; the iteration is rolled back.
    Restarting,
    Completed,
    Failed,
}

impl ChainState {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Completed | ChainState::Failed)
    }
}

/// Markov chain Monte Carlo driver over a [`Sampler`].
///
/// The driver owns the sampler, its random number generator and, after a
/// successful [`run`](Mcmc::run), the simulation history.
///
/// # Example
///
/// ```rust,ignore
/// use trendfilter::prelude::*;
///
/// let sampler = L1Sampler::new(&y, &FilterOptions::l1(2))?;
/// let mut mcmc = Mcmc::with_seed(sampler, 42);
/// mcmc.run(100, 5, Verbosity::Iterations)?;
/// let trend = mcmc.output(50, "trend")?;
/// ```
#[derive(Debug)]
pub struct Mcmc<S: Sampler> {
    sampler: S,
    rng: Xoshiro256PlusPlus,
    history: Option<SimulationHistory>,
    state: ChainState,
    total_restarts: usize,
}

impl<S: Sampler> Mcmc<S> {
    /// Create a driver seeded from entropy.
    pub fn new(sampler: S) -> Self {
        Self::with_seed(sampler, rand::random())
    }

    /// Create a driver with a reproducible random stream.
    pub fn with_seed(sampler: S, seed: u64) -> Self {
        Self {
            sampler,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            history: None,
            state: ChainState::Initializing,
            total_restarts: 0,
        }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// History of the last completed run.
    pub fn simulations(&self) -> Option<&SimulationHistory> {
        self.history.as_ref()
    }

    /// Number of restarts over the whole last run.
    pub fn total_restarts(&self) -> usize {
        self.total_restarts
    }

    /// Consume the driver, returning the sampler and the history of the last run.
    pub fn into_parts(self) -> (S, Option<SimulationHistory>) {
        (self.sampler, self.history)
    }

    /// Run `number_simulations` Gibbs sweeps.
    ///
    /// A numerical failure of any draw discards the partial iteration and
    /// retries it, at most `max_restart` times per iteration. Any other error
    /// aborts the run immediately. On failure no history is kept.
    pub fn run(
        &mut self,
        number_simulations: usize,
        max_restart: usize,
        verbosity: Verbosity,
    ) -> Result<(), McmcError> {
        if number_simulations == 0 {
            return Err(OptionsError::InvalidNumberSimulations(0).into());
        }

        self.history = None;
        self.total_restarts = 0;
        self.state = ChainState::Initializing;

        let hierarchy: Vec<String> = self
            .sampler
            .parameters()
            .hierarchy()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut history = SimulationHistory::default();
        let mut snapshot = Vec::new();
        let mut iteration = 0;
        let mut restarts = 0;

        while !self.state.is_terminal() {
            match self.state {
                ChainState::Initializing => {
                    history = SimulationHistory::for_parameters(
                        self.sampler.parameters(),
                        number_simulations,
                    );
                    if let Err(err) = self.seed(&hierarchy) {
                        self.state = ChainState::Failed;
                        return Err(err.into());
                    }
                    snapshot = self.sampler.parameters().snapshot();
                    self.state = ChainState::SweepingParameter(0);
                }
                ChainState::SweepingParameter(i) => {
                    let Some(name) = hierarchy.get(i) else {
                        self.state = ChainState::RecordingSample;
                        continue;
                    };
                    if i == 0 && verbosity >= Verbosity::Iterations {
                        tracing::info!(iteration, restarts, "gibbs iteration");
                    }

                    match self.step(name, iteration, &mut history) {
                        Ok(()) => {
                            if verbosity >= Verbosity::Parameters {
                                tracing::debug!(iteration, parameter = %name, "parameter drawn");
                            }
                            self.state = ChainState::SweepingParameter(i + 1);
                        }
                        Err(err) if err.is_numerical() && restarts < max_restart => {
                            if verbosity >= Verbosity::Restarts {
                                tracing::warn!(
                                    iteration,
                                    parameter = %name,
                                    restart = restarts + 1,
                                    max_restart,
                                    error = %err,
                                    "numerical failure, restarting iteration"
                                );
                            }
                            self.state = ChainState::Restarting;
                        }
                        Err(err) if err.is_numerical() => {
                            self.sampler.parameters_mut().restore(snapshot);
                            self.state = ChainState::Failed;
                            tracing::warn!(
                                iteration,
                                restarts,
                                error = %err,
                                "filter did not converge"
                            );
                            return Err(McmcError::ConvergenceFailed {
                                iteration,
                                restarts,
                                cause: err,
                            });
                        }
                        Err(err) => {
                            self.state = ChainState::Failed;
                            return Err(err.into());
                        }
                    }
                }
                ChainState::RecordingSample => {
                    iteration += 1;
                    restarts = 0;
                    if iteration < number_simulations {
                        snapshot = self.sampler.parameters().snapshot();
                        self.state = ChainState::SweepingParameter(0);
                    } else {
                        self.state = ChainState::Completed;
                    }
                }
                ChainState::Restarting => {
                    self.sampler.parameters_mut().restore(snapshot.clone());
                    restarts += 1;
                    self.total_restarts += 1;
                    self.state = ChainState::SweepingParameter(0);
                }
                ChainState::Completed | ChainState::Failed => {}
            }
        }

        self.history = Some(history);
        Ok(())
    }

    /// Posterior mean of `name` over the simulations with index `>= burn`.
    pub fn output(&self, burn: usize, name: &str) -> Result<Mat<f64>, McmcError> {
        let history = self.history.as_ref().ok_or(McmcError::NotRun)?;
        let number_simulations = history.number_simulations();
        if burn >= number_simulations {
            return Err(McmcError::InvalidBurn {
                burn,
                number_simulations,
            });
        }
        Ok(self.sampler.output(history, burn, name)?)
    }

    /// Set every parameter to its initial value.
    fn seed(&mut self, hierarchy: &[String]) -> Result<(), SamplerError> {
        for name in hierarchy {
            let value = self.sampler.initial_value(name)?;
            self.sampler
                .parameters_mut()
                .get_mut(name)?
                .set_value(value)?;
        }
        Ok(())
    }

    /// Draw one parameter, commit it and record it at `iteration`.
    fn step(
        &mut self,
        name: &str,
        iteration: usize,
        history: &mut SimulationHistory,
    ) -> Result<(), SamplerError> {
        let value = self.sampler.generate(name, &mut self.rng)?;
        history.record(name, iteration, &value)?;
        self.sampler.parameters_mut().get_mut(name)?.set_value(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FilterOptions;
    use crate::samplers::L1Sampler;
    use faer::Col;

    fn series(n: usize) -> Col<f64> {
        Col::from_fn(n, |i| 5.0 + (i as f64 * 0.4).sin() + 0.05 * i as f64)
    }

    fn driver(n: usize, order: usize) -> Mcmc<L1Sampler> {
        let sampler = L1Sampler::new(&series(n), &FilterOptions::l1(order)).unwrap();
        Mcmc::with_seed(sampler, 1234)
    }

    #[test]
    fn test_fresh_driver() {
        let mcmc = driver(20, 2);
        assert_eq!(mcmc.state(), ChainState::Initializing);
        assert!(mcmc.simulations().is_none());
        assert_eq!(mcmc.output(0, "trend").unwrap_err(), McmcError::NotRun);
    }

    #[test]
    fn test_run_completes() {
        let mut mcmc = driver(40, 2);
        mcmc.run(20, 5, Verbosity::Quiet).unwrap();
        assert_eq!(mcmc.state(), ChainState::Completed);
        assert!(mcmc.state().is_terminal());

        let history = mcmc.simulations().unwrap();
        assert_eq!(history.number_simulations(), 20);
        assert_eq!(history.trace("trend").unwrap().shape(), (40, 1, 20));
        assert_eq!(history.trace("omega").unwrap().shape(), (38, 1, 20));

        let trend = mcmc.output(10, "trend").unwrap();
        assert_eq!((trend.nrows(), trend.ncols()), (40, 1));
        assert!((0..40).all(|i| trend[(i, 0)].is_finite()));
    }

    #[test]
    fn test_run_is_reproducible() {
        let mut a = driver(25, 1);
        let mut b = driver(25, 1);
        a.run(10, 5, Verbosity::Quiet).unwrap();
        b.run(10, 5, Verbosity::Quiet).unwrap();
        let ma = a.output(2, "sigma2").unwrap();
        let mb = b.output(2, "sigma2").unwrap();
        assert_eq!(ma[(0, 0)], mb[(0, 0)]);
    }

    #[test]
    fn test_output_validates_arguments() {
        let mut mcmc = driver(20, 2);
        mcmc.run(5, 5, Verbosity::Quiet).unwrap();
        assert_eq!(
            mcmc.output(5, "trend").unwrap_err(),
            McmcError::InvalidBurn {
                burn: 5,
                number_simulations: 5
            }
        );
        assert!(matches!(
            mcmc.output(0, "tau"),
            Err(McmcError::Sampler(SamplerError::Parameter(_)))
        ));
    }

    #[test]
    fn test_zero_simulations_rejected() {
        let mut mcmc = driver(20, 2);
        assert_eq!(
            mcmc.run(0, 5, Verbosity::Quiet),
            Err(McmcError::Options(OptionsError::InvalidNumberSimulations(0)))
        );
        assert_eq!(mcmc.state(), ChainState::Initializing);
    }
}
