//! Column schema (the `columns` block of a scenario load) and the type
//! coercion applied to every edited value before it is tracked.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::PropertyValue;
use crate::value::exact_int;
use crate::error::{ValidationError, ValidationErrorKind};

/// Declared scalar type of a column.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    #[cfg_attr(feature = "serde", serde(alias = "integer"))]
    Int,
    #[cfg_attr(feature = "serde", serde(alias = "double", alias = "number"))]
    Float,
    #[cfg_attr(feature = "serde", serde(alias = "str", alias = "string"))]
    Text,
    #[cfg_attr(feature = "serde", serde(alias = "bool"))]
    Boolean,
    /// Text restricted to [`ColumnSpec::choices`].
    Choice,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Text => "text",
            PropertyType::Boolean => "boolean",
            PropertyType::Choice => "choice",
        })
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: PropertyType,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub choices: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub nullable: bool,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub min: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub max: Option<f64>,
}

impl ColumnSpec {
    pub fn new(kind: PropertyType) -> Self {
        Self {
            kind,
            choices: Vec::new(),
            nullable: false,
            min: None,
            max: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Coerce `value` to this column's type, rejecting what cannot be
    /// represented. The returned value is what gets stored and tracked.
    pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue, ValidationErrorKind> {
        if value.is_null() {
            return if self.nullable {
                Ok(PropertyValue::Null)
            } else {
                Err(ValidationErrorKind::Required)
            };
        }
        let coerced = match self.kind {
            PropertyType::Int => PropertyValue::Int(coerce_int(&value).ok_or_else(|| {
                self.mismatch(&value)
            })?),
            PropertyType::Float => {
                let n = coerce_float(&value).ok_or_else(|| self.mismatch(&value))?;
                if !n.is_finite() {
                    return Err(ValidationErrorKind::NonFinite);
                }
                PropertyValue::Number(n)
            }
            PropertyType::Boolean => {
                PropertyValue::Boolean(coerce_bool(&value).ok_or_else(|| self.mismatch(&value))?)
            }
            PropertyType::Text => match value {
                PropertyValue::Text(s) => PropertyValue::Text(s),
                other => PropertyValue::Text(other.to_string()),
            },
            PropertyType::Choice => {
                let text = match value {
                    PropertyValue::Text(s) => s,
                    PropertyValue::Boolean(_) => return Err(self.mismatch(&value)),
                    other => other.to_string(),
                };
                if !self.choices.iter().any(|c| c == &text) {
                    return Err(ValidationErrorKind::NotAChoice {
                        value: text,
                        choices: self.choices.clone(),
                    });
                }
                PropertyValue::Text(text)
            }
        };
        self.check_range(&coerced)?;
        Ok(coerced)
    }

    fn check_range(&self, value: &PropertyValue) -> Result<(), ValidationErrorKind> {
        let Some(n) = value.as_f64() else {
            return Ok(());
        };
        let below = self.min.is_some_and(|lo| n < lo);
        let above = self.max.is_some_and(|hi| n > hi);
        if below || above {
            return Err(ValidationErrorKind::OutOfRange {
                value: n,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn mismatch(&self, value: &PropertyValue) -> ValidationErrorKind {
        ValidationErrorKind::TypeMismatch {
            expected: self.kind,
            found: format!("{} `{value}`", value.type_name()),
        }
    }
}

fn coerce_int(value: &PropertyValue) -> Option<i64> {
    match value {
        PropertyValue::Int(i) => Some(*i),
        PropertyValue::Number(n) => exact_int(*n),
        PropertyValue::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(exact_int))
        }
        _ => None,
    }
}

fn coerce_float(value: &PropertyValue) -> Option<f64> {
    match value {
        PropertyValue::Int(i) => Some(*i as f64),
        PropertyValue::Number(n) => Some(*n),
        PropertyValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &PropertyValue) -> Option<bool> {
    match value {
        PropertyValue::Boolean(b) => Some(*b),
        PropertyValue::Int(0) => Some(false),
        PropertyValue::Int(1) => Some(true),
        PropertyValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// `table → property → ColumnSpec`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSchema {
    tables: BTreeMap<String, BTreeMap<String, ColumnSpec>>,
}

impl ColumnSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, property: impl Into<String>, spec: ColumnSpec) {
        self.tables
            .entry(table.into())
            .or_default()
            .insert(property.into(), spec);
    }

    pub fn with_column(
        mut self,
        table: impl Into<String>,
        property: impl Into<String>,
        spec: ColumnSpec,
    ) -> Self {
        self.insert(table, property, spec);
        self
    }

    pub fn column(&self, table: &str, property: &str) -> Option<&ColumnSpec> {
        self.tables.get(table).and_then(|cols| cols.get(property))
    }

    pub fn table(&self, table: &str) -> Option<&BTreeMap<String, ColumnSpec>> {
        self.tables.get(table)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of declared columns across all tables.
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    /// Coerce a value destined for `table.property`.
    ///
    /// Properties without a declared column pass through unchanged; the
    /// schema only constrains what it describes.
    pub fn coerce(
        &self,
        table: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<PropertyValue, ValidationError> {
        match self.column(table, property) {
            Some(spec) => spec
                .coerce(value)
                .map_err(|kind| ValidationError::new(table, property, kind)),
            None => Ok(value),
        }
    }
}
