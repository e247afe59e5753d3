//! Best-effort numeric coercion for transport payloads
//!
//! Upstream collectors forward exchange payloads as loosely typed JSON: a
//! price may arrive as `101.5`, `"101.5"` or `" 1.015e2 "`. Everything is
//! normalized here into `Decimal` (prices, sizes, amounts) or integer epoch
//! milliseconds (timestamps) so downstream arithmetic is exact.
//!
//! Coercion never panics. Callers decide whether a failure drops the event,
//! drops one level, or falls back to a default.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoercionError;

/// Largest accepted price, size or amount.
pub const MAX_QUANTITY: i64 = 1_000_000_000_000_000;

/// Largest accepted timestamp magnitude in milliseconds (about year 33658).
pub const MAX_TIMESTAMP_MS: i64 = 1_000_000_000_000_000;

/// How forgiving coercion is about the JSON type of numeric fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Only JSON numbers are accepted.
    Strict,
    /// JSON numbers and numeric strings are accepted.
    #[default]
    Lenient,
}

/// Coerce a JSON value into a `Decimal`.
pub fn coerce_decimal(
    value: Option<&Value>,
    field: &'static str,
    mode: CoercionMode,
) -> Result<Decimal, CoercionError> {
    match value {
        None | Some(Value::Null) => Err(CoercionError::Missing { field }),
        Some(Value::Number(n)) => parse_decimal(&n.to_string(), field),
        Some(Value::String(s)) => match mode {
            CoercionMode::Lenient => parse_decimal(s.trim(), field),
            CoercionMode::Strict => Err(CoercionError::StrictType {
                field,
                value: s.clone(),
            }),
        },
        Some(other) => Err(CoercionError::NotNumeric {
            field,
            value: other.to_string(),
        }),
    }
}

/// Coerce a price or size, rejecting negative values and values above
/// `MAX_QUANTITY`.
pub fn coerce_non_negative(
    value: Option<&Value>,
    field: &'static str,
    mode: CoercionMode,
) -> Result<Decimal, CoercionError> {
    let dec = coerce_decimal(value, field, mode)?;
    if dec.is_sign_negative() && !dec.is_zero() {
        return Err(CoercionError::Negative {
            field,
            value: dec.to_string(),
        });
    }
    if dec > Decimal::from(MAX_QUANTITY) {
        return Err(CoercionError::OutOfRange {
            field,
            value: dec.to_string(),
        });
    }
    Ok(dec)
}

/// Coerce a trade amount.
///
/// Missing or non-numeric amounts count as zero volume. Negative and
/// out-of-range amounts are still errors.
pub fn coerce_amount(
    value: Option<&Value>,
    mode: CoercionMode,
) -> Result<Decimal, CoercionError> {
    match coerce_non_negative(value, "amount", mode) {
        Ok(amount) => Ok(amount),
        Err(err @ (CoercionError::Negative { .. } | CoercionError::OutOfRange { .. })) => Err(err),
        Err(_) => Ok(Decimal::ZERO),
    }
}

/// Coerce an epoch-millisecond timestamp. Fractional values are floored and
/// the result must lie within `MAX_TIMESTAMP_MS` of the epoch.
pub fn coerce_timestamp_ms(
    value: Option<&Value>,
    field: &'static str,
    mode: CoercionMode,
) -> Result<i64, CoercionError> {
    let ms = parse_timestamp_ms(value, field, mode)?;
    if !(-MAX_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&ms) {
        return Err(CoercionError::OutOfRange {
            field,
            value: ms.to_string(),
        });
    }
    Ok(ms)
}

fn parse_timestamp_ms(
    value: Option<&Value>,
    field: &'static str,
    mode: CoercionMode,
) -> Result<i64, CoercionError> {
    match value {
        None | Some(Value::Null) => Err(CoercionError::Missing { field }),
        Some(Value::Number(n)) => {
            if let Some(ms) = n.as_i64() {
                Ok(ms)
            } else if let Some(f) = n.as_f64() {
                float_to_ms(f, field, &n.to_string())
            } else {
                Err(CoercionError::OutOfRange {
                    field,
                    value: n.to_string(),
                })
            }
        }
        Some(Value::String(s)) => {
            if mode == CoercionMode::Strict {
                return Err(CoercionError::StrictType {
                    field,
                    value: s.clone(),
                });
            }
            let trimmed = s.trim();
            if let Ok(ms) = trimmed.parse::<i64>() {
                return Ok(ms);
            }
            match trimmed.parse::<f64>() {
                Ok(f) => float_to_ms(f, field, s),
                Err(_) => Err(CoercionError::NotNumeric {
                    field,
                    value: s.clone(),
                }),
            }
        }
        Some(other) => Err(CoercionError::NotNumeric {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_decimal(s: &str, field: &'static str) -> Result<Decimal, CoercionError> {
    if s.is_empty() {
        return Err(CoercionError::NotNumeric {
            field,
            value: s.to_string(),
        });
    }

    let parsed = Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s));
    match parsed {
        Ok(dec) => Ok(dec.normalize()),
        Err(_) if looks_numeric(s) => Err(CoercionError::OutOfRange {
            field,
            value: s.to_string(),
        }),
        Err(_) => Err(CoercionError::NotNumeric {
            field,
            value: s.to_string(),
        }),
    }
}

/// Distinguishes "too large for Decimal" from plain garbage.
fn looks_numeric(s: &str) -> bool {
    s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn float_to_ms(f: f64, field: &'static str, raw: &str) -> Result<i64, CoercionError> {
    if !f.is_finite() {
        return Err(CoercionError::NotNumeric {
            field,
            value: raw.to_string(),
        });
    }
    let floored = f.floor();
    if floored < i64::MIN as f64 || floored >= i64::MAX as f64 {
        return Err(CoercionError::OutOfRange {
            field,
            value: raw.to_string(),
        });
    }
    Ok(floored as i64)
}
