//! Error types for service reference parsing.

use thiserror::Error;

/// Errors produced while parsing a composite service reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The reference has fewer colon-separated fields than required.
    #[error("Too few fields in service reference: expected at least {expected}, got {actual}")]
    TooFewFields { expected: usize, actual: usize },

    /// A numeric field is not valid hexadecimal (or does not fit its type).
    #[error("Invalid hex value for {field}: {value:?}")]
    InvalidHex { field: &'static str, value: String },
}
