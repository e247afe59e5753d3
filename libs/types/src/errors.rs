//! Error types for market value construction
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Market key construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketKeyError {
    #[error("exchange id is empty")]
    EmptyExchange,

    #[error("symbol is empty for exchange {exchange_id}")]
    EmptySymbol { exchange_id: String },

    #[error("expected EXCHANGE:SYMBOL, got {0:?}")]
    MissingSeparator(String),
}

/// Numeric coercion errors
///
/// Raised when a transport payload field cannot be turned into a number.
/// Whether the error drops the whole event or only one level is decided by
/// the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("missing field: {field}")]
    Missing { field: &'static str },

    #[error("field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field {field} must be a JSON number in strict mode, got {value}")]
    StrictType { field: &'static str, value: String },

    #[error("field {field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("field {field} must not be negative: {value}")]
    Negative { field: &'static str, value: String },

    #[error("invalid side: {0:?}")]
    InvalidSide(String),

    #[error("malformed price level: {0}")]
    MalformedLevel(String),
}

impl CoercionError {
    /// Name of the offending field, if the error is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            CoercionError::Missing { field }
            | CoercionError::NotNumeric { field, .. }
            | CoercionError::StrictType { field, .. }
            | CoercionError::OutOfRange { field, .. }
            | CoercionError::Negative { field, .. } => Some(field),
            CoercionError::InvalidSide(_) => Some("side"),
            CoercionError::MalformedLevel(_) => None,
        }
    }
}
