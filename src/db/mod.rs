//! Boundary to the external SQL-execution handle.
//!
//! The core never owns a connection pool; it talks to whatever implements
//! [`Connection`]. Result sets are materialized into [`Rows`], so nothing
//! stays open once a call returns, whichever path it returns on.
//!
//! An adapter for [`rusqlite::Connection`] ships in [`sqlite`].

pub mod sqlite;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type for database calls.
pub type DbResult<T> = Result<T, DbError>;

/// Errors from the execution handle, surfaced to callers unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error reported by another driver, passed through as text.
    #[error("driver error: {0}")]
    Driver(String),

    #[error("result set has no column `{0}`")]
    MissingColumn(String),

    /// Catalog data that does not form consistent table metadata.
    #[error(transparent)]
    Metadata(#[from] crate::schema::MetadataError),
}

/// A bound argument or a fetched cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            Value::Float(f) => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret catalog flags such as `1`, `YES`, `true`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Text(s) => match s.to_ascii_uppercase().as_str() {
                "1" | "YES" | "Y" | "TRUE" | "T" => Some(true),
                "0" | "NO" | "N" | "FALSE" | "F" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A row keyed by column name, the unit sessions insert and return.
pub type Record = BTreeMap<String, Value>;

/// A fully materialized result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn first(&self) -> Option<Row<'_>> {
        self.iter().next()
    }

    /// Convert every row into a [`Record`].
    pub fn into_records(self) -> Vec<Record> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect())
            .collect()
    }
}

/// One row of a [`Rows`] set.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Cell by column name; catalog column casing varies by backend, so the
    /// match is case-insensitive.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    pub fn get_idx(&self, idx: usize) -> Option<&'a Value> {
        self.values.get(idx)
    }

    /// Like [`Row::get`] but a missing column is an error.
    pub fn require(&self, name: &str) -> DbResult<&'a Value> {
        self.get(name)
            .ok_or_else(|| DbError::MissingColumn(name.to_string()))
    }

    /// Text cell, treating NULL as absent.
    pub fn get_string(&self, name: &str) -> DbResult<Option<String>> {
        Ok(match self.require(name)? {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Blocking SQL-execution handle.
///
/// SQL handed to these methods has already been run through the dialect's
/// filters, so placeholders are in the backend's native form.
pub trait Connection {
    fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Rows>;

    fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<ExecResult>;

    fn begin(&mut self) -> DbResult<()> {
        self.exec("BEGIN", &[]).map(|_| ())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.exec("COMMIT", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.exec("ROLLBACK", &[]).map(|_| ())
    }
}
