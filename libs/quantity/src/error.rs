//! Error types for quantity parsing.

use thiserror::Error;

/// Errors that can occur when parsing a resource quantity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The quantity string is empty.
    #[error("quantity cannot be empty")]
    Empty,

    /// The numeric portion could not be parsed.
    #[error("invalid quantity number in '{0}'")]
    InvalidNumber(String),

    /// The suffix is not a known binary, decimal or exponent suffix.
    #[error("unknown quantity suffix '{suffix}' in '{input}'")]
    UnknownSuffix { input: String, suffix: String },

    /// Storage sizes cannot be negative.
    #[error("quantity '{0}' is negative")]
    Negative(String),

    /// The value does not fit into the supported range.
    #[error("quantity '{0}' is out of range")]
    Overflow(String),
}

impl QuantityError {
    /// Returns true if the error is about the shape of the input rather than its magnitude.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            QuantityError::Empty
                | QuantityError::InvalidNumber(_)
                | QuantityError::UnknownSuffix { .. }
        )
    }
}
