//! Numeric coercion for request amounts.
//!
//! Amounts arrive from untrusted requesters as integers, floats or strings.
//! Every boundary that accepts one runs [`coerce_amount`]: parse as a float,
//! reject anything that is not a finite number, round to the nearest integer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// An amount as received, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Int(n) => write!(f, "{n}"),
            Amount::Float(x) => write!(f, "{x}"),
            Amount::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Amount {
    fn from(n: i64) -> Self {
        Amount::Int(n)
    }
}

impl From<f64> for Amount {
    fn from(x: f64) -> Self {
        Amount::Float(x)
    }
}

impl From<&str> for Amount {
    fn from(s: &str) -> Self {
        Amount::Text(s.to_string())
    }
}

/// Coerce a raw amount to an integer.
pub fn coerce_amount(raw: &Amount) -> Result<i64, RelayError> {
    let value = match raw {
        Amount::Int(n) => return Ok(*n),
        Amount::Float(x) => *x,
        Amount::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid(raw))?,
    };
    if !value.is_finite() || value.abs() > i64::MAX as f64 {
        return Err(invalid(raw));
    }
    Ok(value.round() as i64)
}

/// Coerce an optional amount; a missing amount is invalid.
pub fn require_amount(raw: Option<&Amount>) -> Result<i64, RelayError> {
    match raw {
        Some(a) => coerce_amount(a),
        None => Err(RelayError::InvalidAmount {
            raw: "null".to_string(),
        }),
    }
}

fn invalid(raw: &Amount) -> RelayError {
    RelayError::InvalidAmount {
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_passes_through() {
        assert_eq!(coerce_amount(&Amount::Int(7)).unwrap(), 7);
    }

    #[test]
    fn numeric_string_rounds_to_nearest() {
        assert_eq!(coerce_amount(&"12.7".into()).unwrap(), 13);
        assert_eq!(coerce_amount(&"12.2".into()).unwrap(), 12);
        assert_eq!(coerce_amount(&" 4 ".into()).unwrap(), 4);
    }

    #[test]
    fn float_rounds_to_nearest() {
        assert_eq!(coerce_amount(&Amount::Float(2.5)).unwrap(), 3);
        assert_eq!(coerce_amount(&Amount::Float(-1.4)).unwrap(), -1);
    }

    #[test]
    fn non_numeric_string_rejected() {
        let err = coerce_amount(&"not-a-number".into()).unwrap_err();
        assert_eq!(err.code(), "InvalidAmount");
    }

    #[test]
    fn nan_and_infinity_rejected() {
        assert!(coerce_amount(&"NaN".into()).is_err());
        assert!(coerce_amount(&Amount::Float(f64::INFINITY)).is_err());
        assert!(coerce_amount(&"inf".into()).is_err());
    }

    #[test]
    fn missing_amount_rejected() {
        assert_eq!(require_amount(None).unwrap_err().code(), "InvalidAmount");
    }

    #[test]
    fn deserializes_untagged_json() {
        let a: Amount = serde_json::from_str("8").unwrap();
        assert_eq!(a, Amount::Int(8));
        let b: Amount = serde_json::from_str("\"12.7\"").unwrap();
        assert_eq!(coerce_amount(&b).unwrap(), 13);
        let c: Amount = serde_json::from_str("2.5").unwrap();
        assert_eq!(c, Amount::Float(2.5));
    }
}
