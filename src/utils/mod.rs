//! Numerical helpers shared by the samplers.

mod derivative;
mod matrix;

pub use derivative::{derivative_matrix, difference_coefficients, OperatorError};
pub use matrix::{col_to_mat, mat_to_col, scalar_mat};
