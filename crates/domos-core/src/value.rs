//! Runtime values
//!
//! Formula evaluation and binding construction deal in exactly two shapes:
//! doubles and strings. Sensor history is stored as text, so a value that
//! parses as a double becomes a number and anything else stays a string -
//! string-valued sensors are legal and flow through guards and action
//! arguments unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A number-or-string runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Num(f64),
    Str(String),
}

impl Value {
    /// Interpret stored text: numeric text becomes a number, anything else
    /// stays a string.
    #[must_use]
    pub fn coerce(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) => Value::Num(n),
            Err(_) => Value::Str(text.to_string()),
        }
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Truthiness: non-zero numbers and non-empty strings are true.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Short type name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Str(_) => "string",
        }
    }

    /// Convert to JSON for outbound RPC arguments. Numbers stay numbers;
    /// a non-finite double has no JSON form and maps to null.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Canonical text form of a double: the shortest representation that
/// round-trips, always with a decimal point for integral values (`53.0`).
/// This is the form triggers persist and compare for change detection.
#[must_use]
pub fn fmt_double(n: f64) -> String {
    format!("{:?}", n)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", fmt_double(*n)),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Num(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_parses_numeric_text() {
        assert_eq!(Value::coerce("3"), Value::Num(3.0));
        assert_eq!(Value::coerce(" 21.5 "), Value::Num(21.5));
        assert_eq!(Value::coerce("open"), Value::Str("open".to_string()));
    }

    #[test]
    fn integral_doubles_keep_their_decimal_point() {
        assert_eq!(fmt_double(53.0), "53.0");
        assert_eq!(fmt_double(0.5), "0.5");
        assert_eq!(fmt_double(-2.0), "-2.0");
    }

    #[test]
    fn truthiness_matches_zero_and_empty() {
        assert!(Value::Num(2.0).truthy());
        assert!(!Value::Num(0.0).truthy());
        assert!(Value::Str("on".into()).truthy());
        assert!(!Value::Str(String::new()).truthy());
    }

    #[test]
    fn to_number_reads_numeric_strings() {
        assert_eq!(Value::Str("4.5".into()).to_number(), Some(4.5));
        assert_eq!(Value::Str("open".into()).to_number(), None);
        assert_eq!(Value::Num(1.0).to_number(), Some(1.0));
    }

    #[test]
    fn json_conversion_keeps_numbers_numeric() {
        assert_eq!(Value::Num(10.0).to_json(), serde_json::json!(10.0));
        assert_eq!(
            Value::Str("low".into()).to_json(),
            serde_json::json!("low")
        );
    }
}
