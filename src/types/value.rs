//! Typed property values
//!
//! XMP stores every value as text; this module defines the typed wrapper
//! used by the convenience accessors and the coercions between the text
//! form and the typed forms. Failed coercions are `BadValue` errors.

use crate::core::constants::{FALSE_STRING, TRUE_STRING};
use crate::core::error::{XmpError, XmpResult};
use std::fmt;

/// A typed XMP property value.
#[derive(Debug, Clone, PartialEq)]
pub enum XmpValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// Floating point value
    Double(f64),
}

impl XmpValue {
    /// Get the value as a string, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            XmpValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            XmpValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            XmpValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The canonical text form stored in the tree.
    pub fn serialize(&self) -> String {
        match self {
            XmpValue::String(s) => s.clone(),
            XmpValue::Integer(i) => i.to_string(),
            XmpValue::Boolean(b) => {
                if *b {
                    TRUE_STRING.to_string()
                } else {
                    FALSE_STRING.to_string()
                }
            }
            XmpValue::Double(d) => d.to_string(),
        }
    }
}

impl fmt::Display for XmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

impl From<&str> for XmpValue {
    fn from(value: &str) -> Self {
        XmpValue::String(value.to_string())
    }
}

impl From<String> for XmpValue {
    fn from(value: String) -> Self {
        XmpValue::String(value)
    }
}

impl From<i64> for XmpValue {
    fn from(value: i64) -> Self {
        XmpValue::Integer(value)
    }
}

impl From<bool> for XmpValue {
    fn from(value: bool) -> Self {
        XmpValue::Boolean(value)
    }
}

impl From<f64> for XmpValue {
    fn from(value: f64) -> Self {
        XmpValue::Double(value)
    }
}

/// Convert a property value to a boolean. Integer strings count as true
/// when non-zero; the words "true", "t", "on" and "yes" count as true
/// regardless of case.
pub fn convert_to_boolean(value: &str) -> XmpResult<bool> {
    if value.is_empty() {
        return Err(XmpError::BadValue("Empty convert-string".to_string()));
    }

    let value = value.trim().to_lowercase();

    if let Ok(number) = value.parse::<i64>() {
        return Ok(number != 0);
    }

    Ok(value == "true" || value == "t" || value == "on" || value == "yes")
}

/// Convert a property value to an integer. Hexadecimal values with a
/// `0x` prefix are accepted.
pub fn convert_to_integer(value: &str) -> XmpResult<i64> {
    if value.is_empty() {
        return Err(XmpError::BadValue("Empty convert-string".to_string()));
    }

    let value = value.trim();

    let result = match value.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => value.parse(),
    };

    result.map_err(|_| XmpError::BadValue(format!("Invalid integer string: {}", value)))
}

/// Convert a property value to a double.
pub fn convert_to_double(value: &str) -> XmpResult<f64> {
    if value.is_empty() {
        return Err(XmpError::BadValue("Empty convert-string".to_string()));
    }

    value
        .trim()
        .parse()
        .map_err(|_| XmpError::BadValue(format!("Invalid double string: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize() {
        assert_eq!(XmpValue::String("x".to_string()).serialize(), "x");
        assert_eq!(XmpValue::Integer(42).serialize(), "42");
        assert_eq!(XmpValue::Boolean(true).serialize(), "True");
        assert_eq!(XmpValue::Boolean(false).serialize(), "False");
    }

    #[test]
    fn test_convert_to_boolean() {
        assert!(convert_to_boolean("True").unwrap());
        assert!(convert_to_boolean("true").unwrap());
        assert!(convert_to_boolean("1").unwrap());
        assert!(!convert_to_boolean("0").unwrap());
        assert!(!convert_to_boolean("False").unwrap());
        assert!(!convert_to_boolean("nonsense").unwrap());
        assert!(convert_to_boolean("").is_err());
    }

    #[test]
    fn test_convert_to_integer() {
        assert_eq!(convert_to_integer("42").unwrap(), 42);
        assert_eq!(convert_to_integer("-3").unwrap(), -3);
        assert_eq!(convert_to_integer("0x10").unwrap(), 16);
        assert!(convert_to_integer("4.2").is_err());
        assert!(convert_to_integer("").is_err());
    }

    #[test]
    fn test_convert_to_double() {
        assert_eq!(convert_to_double("4.5").unwrap(), 4.5);
        assert_eq!(convert_to_double("42").unwrap(), 42.0);
        assert!(convert_to_double("x").is_err());
    }
}
