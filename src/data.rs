use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};

/// A single stored or projected value.
///
/// `Null` is distinct from numeric zero all the way through display and
/// export: it renders as an empty field.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Integer(i) => i.to_string(),
            Cell::Real(f) if !f.is_finite() => String::new(),
            Cell::Real(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Blob(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }

    /// Interprets the cell as a coordinate component. Text is parsed leniently
    /// (surrounding whitespace ignored); anything non-finite yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Integer(i) => *i as f64,
            Cell::Real(f) => *f,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Null | Cell::Blob(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
        }
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Cell::Null => ValueRef::Null,
            Cell::Integer(i) => ValueRef::Integer(*i),
            Cell::Real(f) => ValueRef::Real(*f),
            Cell::Text(s) => ValueRef::Text(s.as_bytes()),
            Cell::Blob(bytes) => ValueRef::Blob(bytes),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Integer(i) => serializer.serialize_i64(*i),
            Cell::Real(f) if f.is_finite() => serializer.serialize_f64(*f),
            Cell::Real(_) => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Blob(_) => serializer.serialize_str(&self.as_display()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display())
    }
}
