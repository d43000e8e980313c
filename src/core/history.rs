//! Storage of Markov-chain draws.

use std::collections::HashMap;

use faer::Mat;
use thiserror::Error;

use super::parameter::ParameterSet;

/// Errors raised when writing to or summarizing a simulation history.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HistoryError {
    #[error("no trace recorded for parameter `{0}`")]
    UnknownName(String),

    #[error("draw has shape {got:?}, trace stores {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("simulation index {index} out of bounds for {len} simulations")]
    SliceOutOfBounds { index: usize, len: usize },

    #[error("burn ({burn}) must be smaller than the number of simulations ({simulations})")]
    InvalidBurn { burn: usize, simulations: usize },
}

/// Draws of one parameter, a (rows, cols, simulations) buffer.
///
/// Slice `s` holds the value committed at iteration `s`. Unwritten slices are zero.
#[derive(Debug, Clone)]
pub struct Trace {
    rows: usize,
    cols: usize,
    simulations: usize,
    data: Vec<f64>,
}

impl Trace {
    /// Allocate a zeroed buffer.
    pub fn new(rows: usize, cols: usize, simulations: usize) -> Self {
        Self {
            rows,
            cols,
            simulations,
            data: vec![0.0; rows * cols * simulations],
        }
    }

    /// (rows, cols, simulations).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.simulations)
    }

    #[inline]
    fn offset(&self, row: usize, col: usize, simulation: usize) -> usize {
        simulation * self.rows * self.cols + col * self.rows + row
    }

    /// Value of element (row, col) at a given simulation.
    pub fn get(&self, row: usize, col: usize, simulation: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols || simulation >= self.simulations {
            return None;
        }
        Some(self.data[self.offset(row, col, simulation)])
    }

    /// Write the draw of one iteration.
    pub fn record(&mut self, simulation: usize, value: &Mat<f64>) -> Result<(), HistoryError> {
        if simulation >= self.simulations {
            return Err(HistoryError::SliceOutOfBounds {
                index: simulation,
                len: self.simulations,
            });
        }
        if (value.nrows(), value.ncols()) != (self.rows, self.cols) {
            return Err(HistoryError::ShapeMismatch {
                expected: (self.rows, self.cols),
                got: (value.nrows(), value.ncols()),
            });
        }
        for j in 0..self.cols {
            for i in 0..self.rows {
                let k = self.offset(i, j, simulation);
                self.data[k] = value[(i, j)];
            }
        }
        Ok(())
    }

    /// The draw recorded at one iteration.
    pub fn slice(&self, simulation: usize) -> Option<Mat<f64>> {
        if simulation >= self.simulations {
            return None;
        }
        Some(Mat::from_fn(self.rows, self.cols, |i, j| {
            self.data[self.offset(i, j, simulation)]
        }))
    }

    /// Chain of a single element across all simulations.
    pub fn chain(&self, row: usize, col: usize) -> Vec<f64> {
        if row >= self.rows || col >= self.cols {
            return Vec::new();
        }
        (0..self.simulations)
            .map(|s| self.data[self.offset(row, col, s)])
            .collect()
    }

    /// Element-wise mean over the simulations with index `>= burn`.
    pub fn mean_after(&self, burn: usize) -> Result<Mat<f64>, HistoryError> {
        if burn >= self.simulations {
            return Err(HistoryError::InvalidBurn {
                burn,
                simulations: self.simulations,
            });
        }
        let kept = (self.simulations - burn) as f64;
        let mut mean = Mat::<f64>::zeros(self.rows, self.cols);
        for s in burn..self.simulations {
            for j in 0..self.cols {
                for i in 0..self.rows {
                    mean[(i, j)] += self.data[self.offset(i, j, s)];
                }
            }
        }
        for j in 0..self.cols {
            for i in 0..self.rows {
                mean[(i, j)] /= kept;
            }
        }
        Ok(mean)
    }
}

/// Traces of every parameter of a run, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct SimulationHistory {
    traces: HashMap<String, Trace>,
    number_simulations: usize,
}

impl SimulationHistory {
    /// Allocate one trace per parameter, sized from its declared shape.
    pub fn for_parameters(parameters: &ParameterSet, number_simulations: usize) -> Self {
        let traces = parameters
            .iter()
            .map(|p| {
                let (rows, cols) = p.shape();
                (
                    p.name().to_string(),
                    Trace::new(rows, cols, number_simulations),
                )
            })
            .collect();
        Self {
            traces,
            number_simulations,
        }
    }

    pub fn number_simulations(&self) -> usize {
        self.number_simulations
    }

    /// Trace of a parameter.
    pub fn trace(&self, name: &str) -> Result<&Trace, HistoryError> {
        self.traces
            .get(name)
            .ok_or_else(|| HistoryError::UnknownName(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.traces.contains_key(name)
    }

    /// Names of the recorded parameters, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.traces.keys().map(String::as_str)
    }

    /// Store the draw of `name` at `simulation`.
    pub fn record(
        &mut self,
        name: &str,
        simulation: usize,
        value: &Mat<f64>,
    ) -> Result<(), HistoryError> {
        self.traces
            .get_mut(name)
            .ok_or_else(|| HistoryError::UnknownName(name.to_string()))?
            .record(simulation, value)
    }

    /// Posterior mean of `name` over the post burn-in simulations.
    pub fn posterior_mean(&self, name: &str, burn: usize) -> Result<Mat<f64>, HistoryError> {
        self.trace(name)?.mean_after(burn)
    }
}
