use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A scalar stored in a table cell, a feature property, or a schedule slot.
///
/// Serialized untagged so payload JSON scalars (`null`, `true`, `3`, `0.5`,
/// `"OFF"`) map directly onto a variant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, Default)]
pub enum PropertyValue {
    #[default]
    Null,
    Boolean(bool),
    Int(i64),
    Number(f64),
    Text(String),
}

impl PartialEq for PropertyValue {
    /// Integers and floats compare numerically, so a baseline `3` and an
    /// edited `3.0` are the same value.
    fn eq(&self, other: &Self) -> bool {
        use PropertyValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (Int(a), Number(b)) | (Number(b), Int(a)) => exact_int(*b) == Some(*a),
            (Text(a), Text(b)) => a == b,
            _ => false,
        }
    }
}

/// `n` as an `i64` when it is integral and representable without rounding.
pub(crate) fn exact_int(n: f64) -> Option<i64> {
    // i64::MIN is -2^63 exactly; 2^63 itself is already out of range.
    let lo = i64::MIN as f64;
    (n.is_finite() && n.fract() == 0.0 && n >= lo && n < -lo).then(|| n as i64)
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, ""),
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Name of the variant, used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Int(_) => "int",
            PropertyValue::Number(_) => "float",
            PropertyValue::Text(_) => "text",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(i64::from(v))
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PropertyValue::Null, Into::into)
    }
}
