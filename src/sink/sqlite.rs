//! SQLite destination
//!
//! The local analytical database is a single SQLite file. Each table is
//! replaced inside its own transaction; there is no transaction spanning
//! several tables.

use super::Destination;
use crate::dataset::{Dataset, Value};
use crate::source::quote_identifier;
use eyre::{Context, Result};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}

/// SQL type for a column, inferred from its non-null cells.
///
/// Columns mixing kinds, or holding only nulls, are `TEXT`.
fn column_type(data: &Dataset, idx: usize) -> &'static str {
    let mut kind: Option<&'static str> = None;
    for row in data.rows() {
        let this = match &row[idx] {
            Value::Null => continue,
            Value::Text(_) => "TEXT",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Date(_) => "DATE",
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k == this => {}
            Some(_) => return "TEXT",
        }
    }
    kind.unwrap_or("TEXT")
}

/// Writes tables into a SQLite file, creating it if needed
#[derive(Debug, Clone)]
pub struct SqliteDestination {
    path: PathBuf,
}

impl SqliteDestination {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_table(&self, table: &str, data: &Dataset) -> Result<usize> {
        if data.columns().is_empty() {
            eyre::bail!("Cannot create table {} without columns", table);
        }

        let mut conn = Connection::open(&self.path).with_context(|| {
            format!("Failed to open target database: {}", self.path.display())
        })?;
        let tx = conn.transaction()?;

        let name = quote_identifier(table);
        tx.execute(&format!("DROP TABLE IF EXISTS {}", name), [])?;

        let definitions = data
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} {}", quote_identifier(c), column_type(data, i)))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(&format!("CREATE TABLE {} ({})", name, definitions), [])
            .with_context(|| format!("Failed to create table {}", table))?;

        {
            let placeholders = vec!["?"; data.columns().len()].join(", ");
            let mut stmt = tx.prepare(&format!("INSERT INTO {} VALUES ({})", name, placeholders))?;
            for row in data.rows() {
                stmt.execute(params_from_iter(row.iter()))
                    .with_context(|| format!("Failed to insert into {}", table))?;
            }
        }

        tx.commit()
            .with_context(|| format!("Failed to commit table {}", table))?;
        Ok(data.len())
    }
}

impl Destination for SqliteDestination {
    async fn replace_table(&self, table: &str, data: &Dataset) -> Result<usize> {
        self.write_table(table, data)
    }
}
