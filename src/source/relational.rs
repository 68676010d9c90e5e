//! Relational source backed by a SQLite database file

use super::RelationalSource;
use crate::dataset::{Dataset, Value};
use crate::etl::Extractor;
use eyre::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Quote a table or column name for use in SQL
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Read-only relational source over a SQLite file
///
/// A connection is opened per call and closed before returning, so the
/// source itself holds no handle.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open source database: {}", self.path.display()))
    }

    fn read_table_names(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| "Failed to list source tables")?;
        Ok(names)
    }

    fn read_table(&self, table: &str) -> Result<Dataset> {
        let conn = self.connect()?;
        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to query table {}", table))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_sql_ref))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read rows of {}", table))?;

        Ok(Dataset::new(columns, rows))
    }
}

impl RelationalSource for SqliteSource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.read_table_names()
    }

    async fn query(&self, table: &str) -> Result<Dataset> {
        self.read_table(table)
    }
}

/// Extracts one table from a relational source
pub struct TableExtractor<'a, R> {
    source: &'a R,
    table: String,
}

impl<'a, R: RelationalSource> TableExtractor<'a, R> {
    pub fn new(source: &'a R, table: impl Into<String>) -> Self {
        Self {
            source,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl<R: RelationalSource> Extractor for TableExtractor<'_, R> {
    async fn extract(&self) -> Result<Dataset> {
        log::debug!("Reading table {}", self.table);
        let data = self
            .source
            .query(&self.table)
            .await
            .with_context(|| format!("Failed to extract table {}", self.table))?;
        log::info!("Extracted {} row(s) from {}", data.len(), self.table);
        Ok(data)
    }
}
