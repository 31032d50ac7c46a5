//! Binding caller values to a schema.

use crate::error::ValidationError;
use crate::parser::{SqlType, parse_sql_type};
use crate::schema::TableSchema;
use crate::value::{Literal, Value, Values};

/// Validated values for one table, in schema column order.
///
/// Used either as data to write or as a filter condition. Binding is
/// all-or-nothing: on the first type error `entries` is empty and
/// [`error`](Self::error) says why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundValues {
    entries: Vec<(String, Literal)>,
    missing_required: Vec<String>,
    error: Option<ValidationError>,
}

impl BoundValues {
    pub fn entries(&self) -> &[(String, Literal)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True iff every required column has an entry.
    pub fn all_required_present(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Required columns with no entry, in schema order.
    pub fn missing_required(&self) -> &[String] {
        &self.missing_required
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }
}

/// Validate `values` against `schema`.
///
/// Names the schema does not know are ignored.
pub fn bind(schema: &TableSchema, values: &Values) -> BoundValues {
    let mut entries = Vec::new();
    let mut error = None;

    for column in schema.columns() {
        let Some(raw) = values.get(column.name()) else {
            continue;
        };
        match coerce(column.name(), column.declared_type(), raw) {
            Ok(literal) => entries.push((column.name().to_string(), literal)),
            Err(e) => {
                tracing::warn!(table = schema.table_name(), error = %e, "value binding failed");
                entries.clear();
                error = Some(e);
                break;
            }
        }
    }

    let missing_required = schema
        .columns()
        .iter()
        .filter(|c| c.is_required() && !entries.iter().any(|(name, _)| name == c.name()))
        .map(|c| c.name().to_string())
        .collect();

    BoundValues {
        entries,
        missing_required,
        error,
    }
}

fn coerce(column: &str, declared_type: &str, raw: &Value) -> Result<Literal, ValidationError> {
    let incorrect = || ValidationError::IncorrectType {
        column: column.to_string(),
        declared_type: declared_type.to_string(),
        value: raw.to_string(),
    };

    match parse_sql_type(declared_type) {
        Some(SqlType::Int) => match raw {
            Value::Int(n) => Ok(Literal::Int(*n)),
            Value::Text(s) => s.trim().parse().map(Literal::Int).map_err(|_| incorrect()),
            Value::Float(f) => float_to_int(*f).map(Literal::Int).ok_or_else(incorrect),
            _ => Err(incorrect()),
        },
        Some(_) => match raw {
            Value::Null => Err(incorrect()),
            other => Ok(Literal::Text(other.to_string())),
        },
        None => Err(ValidationError::UnrecognizedType {
            column: column.to_string(),
            declared_type: declared_type.to_string(),
        }),
    }
}

/// Truncate toward zero, refusing values outside `i64`.
fn float_to_int(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}
