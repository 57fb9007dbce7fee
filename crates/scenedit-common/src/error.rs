//! Validation errors raised while coercing an incoming value to a column's
//! declared type.
//!
//! Validation happens upstream of change tracking: a value that fails here
//! never reaches the store or the change set.

use crate::schema::PropertyType;

/// What went wrong with a single value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationErrorKind {
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: PropertyType,
        found: String,
    },
    #[error("a value is required")]
    Required,
    #[error("`{value}` is not one of {choices:?}")]
    NotAChoice { value: String, choices: Vec<String> },
    #[error("{value} is outside {}", bounds_label(.min, .max))]
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[error("number is not finite")]
    NonFinite,
}

fn bounds_label(min: &Option<f64>, max: &Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
        (Some(lo), None) => format!("[{lo}, +inf)"),
        (None, Some(hi)) => format!("(-inf, {hi}]"),
        (None, None) => "(-inf, +inf)".to_string(),
    }
}

/// A rejected value, with the table/property it was destined for.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid value for `{table}.{property}`: {kind}")]
pub struct ValidationError {
    pub table: String,
    pub property: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(
        table: impl Into<String>,
        property: impl Into<String>,
        kind: ValidationErrorKind,
    ) -> Self {
        Self {
            table: table.into(),
            property: property.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_and_reason() {
        let err = ValidationError::new(
            "zone",
            "floors_ag",
            ValidationErrorKind::OutOfRange {
                value: -1.0,
                min: Some(0.0),
                max: None,
            },
        );
        assert_eq!(
            err.to_string(),
            "invalid value for `zone.floors_ag`: -1 is outside [0, +inf)"
        );
    }
}
