//! Transformer trait for data cleaning

use eyre::Result;

/// Transformer trait for turning one value into another
///
/// The cleaners implement this with `Input = Dataset` and
/// `Output = Cleaned`, but the trait itself is not tied to datasets.
///
/// # Example
/// ```
/// use retail_centralizer::etl::Transformer;
/// use eyre::Result;
///
/// struct Upper;
///
/// impl Transformer for Upper {
///     type Input = String;
///     type Output = String;
///
///     fn transform(&self, input: Self::Input) -> Result<Self::Output> {
///         Ok(input.to_uppercase())
///     }
/// }
///
/// assert_eq!(Upper.transform("sales".to_string()).unwrap(), "SALES");
/// ```
pub trait Transformer: Send + Sync {
    /// Input type
    type Input: Send;

    /// Output type after transformation
    type Output: Send;

    /// Transform a single input
    ///
    /// # Errors
    /// Returns an error if transformation fails
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;
}
