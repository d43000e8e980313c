//! Core types for Bayesian trend filtering.

mod history;
mod options;
mod parameter;

pub use history::{HistoryError, SimulationHistory, Trace};
pub use options::{
    FilterOptions, FilterOptionsBuilder, OptionsError, Verbosity, MAX_TOTAL_VARIATION_ORDER,
};
pub use parameter::{Parameter, ParameterError, ParameterSet, PosteriorFamily};
