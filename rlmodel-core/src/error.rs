//! Errors in the library.
use thiserror::Error;

/// Errors raised by models.
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    /// An operation that must be overridden by a concrete model was called.
    #[error("{0}() is not implemented")]
    NotImplemented(&'static str),

    /// The output of `forward()` does not have the shape `[batch, num_outputs]`.
    #[error("Expected output shape [batch, {expected}], got {actual:?}")]
    OutputShape {
        /// The number of outputs declared at construction.
        expected: i64,
        /// The shape actually returned.
        actual: Vec<i64>,
    },

    /// The state returned by `forward()` does not match the initial state.
    #[error("Expected {expected} state tensors, got {actual}")]
    StateLength {
        /// Length of `get_initial_state()`.
        expected: usize,
        /// Length of the returned state.
        actual: usize,
    },
}
