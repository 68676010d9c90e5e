//! Destination store and its loader
//!
//! Cleaned datasets are written with replace semantics: each load drops the
//! target table and recreates it from the dataset. A dataset without
//! columns cannot describe a table, so loading one is an error and the
//! existing table is left alone.

mod sqlite;

pub use sqlite::SqliteDestination;

use crate::dataset::Dataset;
use crate::etl::Loader;
use eyre::{Context, Result};
use std::future::Future;

/// A database that can have whole tables replaced
pub trait Destination: Send + Sync {
    /// Replace `table` with the rows of `data`, returning the rows written
    fn replace_table(
        &self,
        table: &str,
        data: &Dataset,
    ) -> impl Future<Output = Result<usize>> + Send;
}

/// Loads datasets into one table of a [`Destination`]
pub struct TableLoader<'a, W> {
    destination: &'a W,
    table: String,
}

impl<'a, W: Destination> TableLoader<'a, W> {
    pub fn new(destination: &'a W, table: impl Into<String>) -> Self {
        Self {
            destination,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl<W: Destination> Loader for TableLoader<'_, W> {
    async fn load(&self, data: Dataset) -> Result<usize> {
        if data.columns().is_empty() {
            eyre::bail!("No columns to load into {}", self.table);
        }

        let count = self
            .destination
            .replace_table(&self.table, &data)
            .await
            .with_context(|| format!("Failed to upload {}", self.table))?;

        log::info!("Loaded {} row(s) into {}", count, self.table);
        Ok(count)
    }
}
