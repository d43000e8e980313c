//! Discrete difference operators.

use faer::Mat;
use thiserror::Error;

use crate::core::MAX_TOTAL_VARIATION_ORDER;

/// Errors that can occur when building a difference operator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperatorError {
    #[error("unsupported difference order {0}, expected 0 to 3")]
    UnsupportedOrder(usize),

    #[error("series of length {size} is too short for differences of order {order}")]
    SizeTooSmall { size: usize, order: usize },
}

/// Finite-difference coefficients of the given order.
pub fn difference_coefficients(order: usize) -> Result<&'static [f64], OperatorError> {
    match order {
        0 => Ok(&[1.0]),
        1 => Ok(&[-1.0, 1.0]),
        2 => Ok(&[1.0, -2.0, 1.0]),
        3 => Ok(&[-1.0, 3.0, -3.0, 1.0]),
        _ => Err(OperatorError::UnsupportedOrder(order)),
    }
}

/// Build the difference operator D of shape (size - order, size).
///
/// Row `r` holds the coefficients of the `order`-th difference starting at
/// column `r`, so `D * x` approximates the `order`-th derivative of `x`.
///
/// # Example
///
/// ```rust,ignore
/// let d = derivative_matrix(5, 2)?;
/// // row 0: [1, -2, 1, 0, 0]
/// assert_eq!(d.nrows(), 3);
/// ```
pub fn derivative_matrix(size: usize, order: usize) -> Result<Mat<f64>, OperatorError> {
    if order > MAX_TOTAL_VARIATION_ORDER {
        return Err(OperatorError::UnsupportedOrder(order));
    }
    if size <= order {
        return Err(OperatorError::SizeTooSmall { size, order });
    }

    let coefficients = difference_coefficients(order)?;
    let rows = size - order;
    let mut d = Mat::<f64>::zeros(rows, size);
    for r in 0..rows {
        for (l, &c) in coefficients.iter().enumerate() {
            d[(r, r + l)] = c;
        }
    }
    Ok(d)
}
