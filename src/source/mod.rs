//! Source collaborators and their extractors
//!
//! Each kind of source is modelled as a small trait so the pipeline can be
//! driven against real backends or in-memory fakes:
//! - [`RelationalSource`]: tables in a relational database
//! - [`DocumentSource`]: tabular documents (CSV, JSON) on disk or remote
//! - [`StoreApi`]: the paginated store API

mod document;
mod relational;
mod store_api;

pub use document::{DocumentExtractor, DocumentFormat, DocumentReader};
pub use relational::{SqliteSource, TableExtractor};
pub use store_api::{PageFailure, PagedExtraction, StoreApiClient, StoreApiExtractor};

pub(crate) use relational::quote_identifier;

use crate::dataset::Dataset;
use eyre::Result;
use serde_json::{Map, Value};
use std::future::Future;

/// One JSON object returned by an API, keyed by column name
pub type Record = Map<String, Value>;

/// A relational database holding the raw user table
pub trait RelationalSource: Send + Sync {
    /// Names of the tables the source exposes
    fn list_tables(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Every row of one table
    fn query(&self, table: &str) -> impl Future<Output = Result<Dataset>> + Send;
}

/// A store of tabular documents
pub trait DocumentSource: Send + Sync {
    /// Read every table in the document at `location`
    fn extract(&self, location: &str) -> impl Future<Output = Result<Vec<Dataset>>> + Send;
}

/// The store API: a count endpoint plus one detail page per store
pub trait StoreApi: Send + Sync {
    /// Number of stores available
    fn get_count(&self) -> impl Future<Output = Result<usize>> + Send;

    /// Details of the store at `index`. Indexes are 1-based.
    fn get_page(&self, index: usize) -> impl Future<Output = Result<Record>> + Send;
}
