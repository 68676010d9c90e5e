//! Tabular dataset model
//!
//! Every source produces a [`Dataset`]: an ordered list of column names and
//! an ordered list of rows, each row holding one [`Value`] per column.
//! Cleaners consume a dataset by value and hand back a new one; nothing is
//! mutated after it reaches the loader.

use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A typed scalar cell
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Date(NaiveDate),
}

impl Value {
    /// Shorthand for building a text cell
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a cell.
    ///
    /// Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Text(b.to_string()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Real).unwrap_or(Self::Null),
            },
            JsonValue::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Text(s) => s.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Real(r) => r.to_bits().hash(state),
            Self::Date(d) => d.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

/// One row of cells, positionally aligned with [`Dataset::columns`]
pub type Row = Vec<Value>;

/// An ordered, column-named table of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Create a dataset from column names and rows.
    ///
    /// Rows shorter than the header are padded with nulls and longer rows
    /// are truncated so every row lines up with the columns.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Create an empty dataset with the given header
    pub fn with_columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::new(columns.into_iter().map(Into::into).collect(), Vec::new())
    }

    /// Build a dataset from JSON objects.
    ///
    /// Columns are the union of all keys in first-seen order.
    pub fn from_records(records: &[Map<String, JsonValue>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(Value::from_json).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Stack datasets on top of each other.
    ///
    /// The header is the union of all headers in first-seen order; cells a
    /// part does not have are null.
    pub fn concat(parts: Vec<Dataset>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for part in &parts {
            for column in &part.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for part in parts {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| part.column_index(c)).collect();
            for row in part.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in column `name`, if both exist
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Append a row, padding or truncating it to the header width
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Remove a column if present; returns whether it existed
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Keep only the rows for which `keep` returns true.
    ///
    /// Returns the number of rows removed.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Apply `f` to every cell of a column in place.
    ///
    /// Does nothing when the column is absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(Value) -> Value) {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                let cell = std::mem::replace(&mut row[idx], Value::Null);
                row[idx] = f(cell);
            }
        }
    }

    /// Apply `f` to every cell of every column in place
    pub fn map_cells(&mut self, mut f: impl FnMut(Value) -> Value) {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                let value = std::mem::replace(cell, Value::Null);
                *cell = f(value);
            }
        }
    }
}
