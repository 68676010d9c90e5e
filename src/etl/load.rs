//! Loader trait for writing cleaned datasets to a destination

use crate::dataset::Dataset;
use eyre::Result;

/// Loader trait for persisting a cleaned dataset
///
/// # Example
/// ```no_run
/// use retail_centralizer::dataset::Dataset;
/// use retail_centralizer::etl::Loader;
/// use eyre::Result;
///
/// struct CountingLoader;
///
/// impl Loader for CountingLoader {
///     async fn load(&self, data: Dataset) -> Result<usize> {
///         Ok(data.len())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// Load the dataset, consuming it
    ///
    /// Returns the number of rows written
    ///
    /// # Errors
    /// Returns an error if the destination rejects the write
    fn load(&self, data: Dataset) -> impl std::future::Future<Output = Result<usize>> + Send;
}
