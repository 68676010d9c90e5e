//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the trait seams between sources, cleaners and the
//! destination, plus the [`Pipeline`] that sequences them for a full run.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{Pipeline, RunReport, Stage, UploadOutcome, UploadStatus};
pub use transform::Transformer;
