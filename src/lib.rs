//! Retail Data Centralizer
//!
//! A one-shot ETL tool that gathers retail users, cards and stores from a
//! relational database, tabular documents and a paginated API, cleans each
//! dataset and loads the results into one local analytical database.

pub mod clean;
pub mod cli;
pub mod client;
pub mod config;
pub mod dataset;
pub mod etl;
pub mod sink;
pub mod source;

// Re-exports for convenience
pub use clean::{CardCleaner, CleanReport, Cleaned, EntityKind, RulePipeline, StoreCleaner, UserCleaner};
pub use client::{ApiClient, Auth};
pub use config::Settings;
pub use dataset::{Dataset, Value};
pub use etl::{Extractor, Loader, Pipeline, RunReport, Stage, Transformer, UploadOutcome, UploadStatus};
pub use sink::{Destination, SqliteDestination, TableLoader};
pub use source::{DocumentReader, DocumentSource, RelationalSource, SqliteSource, StoreApi, StoreApiClient};
