//! Matrix utility functions.

use faer::{Col, Mat};

/// Copy a column vector into an (n, 1) matrix.
pub fn col_to_mat(x: &Col<f64>) -> Mat<f64> {
    Mat::from_fn(x.nrows(), 1, |i, _| x[i])
}

/// First column of a matrix as a vector.
pub fn mat_to_col(x: &Mat<f64>) -> Col<f64> {
    Col::from_fn(x.nrows(), |i| x[(i, 0)])
}

/// A 1×1 matrix holding `value`.
pub fn scalar_mat(value: f64) -> Mat<f64> {
    Mat::from_fn(1, 1, |_, _| value)
}
