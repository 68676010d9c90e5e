//! Extractor trait for reading raw datasets from a source

use crate::dataset::Dataset;
use eyre::Result;

/// Extractor trait for producing a raw dataset from a source
///
/// Implementors define how rows are pulled from sources like:
/// - Relational tables
/// - Tabular documents (CSV, JSON)
/// - Paginated HTTP APIs
///
/// # Example
/// ```no_run
/// use retail_centralizer::dataset::Dataset;
/// use retail_centralizer::etl::Extractor;
/// use eyre::Result;
///
/// struct FixedExtractor(Dataset);
///
/// impl Extractor for FixedExtractor {
///     async fn extract(&self) -> Result<Dataset> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// Extract the raw dataset
    ///
    /// # Errors
    /// Returns an error if the source is unreachable or its response is malformed
    fn extract(&self) -> impl std::future::Future<Output = Result<Dataset>> + Send;
}
