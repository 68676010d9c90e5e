//! Paginated store API source
//!
//! The API exposes a count endpoint returning `{"number_stores": N}` and a
//! details endpoint returning one JSON object per store at
//! `{details_endpoint}/{index}`.

use super::{Record, StoreApi};
use crate::client::ApiClient;
use crate::dataset::Dataset;
use crate::etl::Extractor;
use eyre::{Context, Result, eyre};
use serde_json::Value;
use std::fmt;

/// Key of the store count in the count endpoint's response
const COUNT_KEY: &str = "number_stores";

/// HTTP implementation of [`StoreApi`]
#[derive(Debug, Clone)]
pub struct StoreApiClient {
    client: ApiClient,
    count_endpoint: String,
    details_endpoint: String,
}

impl StoreApiClient {
    pub fn new(
        client: ApiClient,
        count_endpoint: impl Into<String>,
        details_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            count_endpoint: count_endpoint.into(),
            details_endpoint: details_endpoint.into(),
        }
    }

    fn page_path(&self, index: usize) -> String {
        format!("{}/{}", self.details_endpoint.trim_end_matches('/'), index)
    }
}

/// Read the store count from a count response.
///
/// Accepts `{"number_stores": N}` or a bare number.
fn parse_count(value: &Value) -> Result<usize> {
    let count = match value {
        Value::Object(map) => map.get(COUNT_KEY).and_then(Value::as_u64),
        other => other.as_u64(),
    };
    count
        .map(|c| c as usize)
        .ok_or_else(|| eyre!("Unexpected store count response: {}", value))
}

impl StoreApi for StoreApiClient {
    async fn get_count(&self) -> Result<usize> {
        let value = self
            .client
            .get_json(&self.count_endpoint)
            .await
            .with_context(|| "Failed to fetch store count")?;
        parse_count(&value)
    }

    async fn get_page(&self, index: usize) -> Result<Record> {
        let value = self.client.get_json(&self.page_path(index)).await?;
        match value {
            Value::Object(record) => Ok(record),
            other => Err(eyre!("Store {} is not a JSON object: {}", index, other)),
        }
    }
}

/// A page that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub index: usize,
    pub error: String,
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store {}: {}", self.index, self.error)
    }
}

/// Stores fetched by a page sweep plus the pages that failed
#[derive(Debug, Clone)]
pub struct PagedExtraction {
    pub dataset: Dataset,
    pub failures: Vec<PageFailure>,
}

/// Extracts every store from a [`StoreApi`]
///
/// Pages are fetched one at a time in index order. A failing page is
/// recorded and skipped; it never stops the sweep.
pub struct StoreApiExtractor<'a, A> {
    api: &'a A,
}

impl<'a, A: StoreApi> StoreApiExtractor<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Ask the API how many stores exist
    pub async fn count(&self) -> Result<usize> {
        let count = self.api.get_count().await?;
        log::info!("Store API reports {} store(s)", count);
        Ok(count)
    }

    /// Fetch pages `1..=count`
    pub async fn pages(&self, count: usize) -> PagedExtraction {
        let mut records = Vec::with_capacity(count);
        let mut failures = Vec::new();

        for index in 1..=count {
            match self.api.get_page(index).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("Failed to fetch store {}: {}", index, e);
                    failures.push(PageFailure {
                        index,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        log::info!(
            "Fetched {} of {} store(s), {} failed",
            records.len(),
            count,
            failures.len()
        );

        PagedExtraction {
            dataset: Dataset::from_records(&records),
            failures,
        }
    }
}

impl<A: StoreApi> Extractor for StoreApiExtractor<'_, A> {
    async fn extract(&self) -> Result<Dataset> {
        let count = self.count().await?;
        Ok(self.pages(count).await.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Auth;
    use crate::dataset::Value as Cell;
    use serde_json::json;
    use url::Url;

    struct FlakyApi {
        count: usize,
        failing: Vec<usize>,
    }

    impl StoreApi for FlakyApi {
        async fn get_count(&self) -> Result<usize> {
            Ok(self.count)
        }

        async fn get_page(&self, index: usize) -> Result<Record> {
            if self.failing.contains(&index) {
                eyre::bail!("request for store {} timed out", index);
            }
            let value = json!({"index": index, "store_code": format!("AB-{:08}", index)});
            Ok(value.as_object().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_sweep() {
        let api = FlakyApi {
            count: 10,
            failing: vec![3],
        };
        let extraction = StoreApiExtractor::new(&api).pages(10).await;

        assert_eq!(extraction.dataset.len(), 9);
        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].index, 3);
        assert!(extraction.failures[0].error.contains("timed out"));

        let indexes: Vec<i64> = extraction
            .dataset
            .column("index")
            .unwrap()
            .into_iter()
            .filter_map(Cell::as_integer)
            .collect();
        assert_eq!(indexes, vec![1, 2, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_extract_uses_count() {
        let api = FlakyApi {
            count: 4,
            failing: vec![],
        };
        let data = StoreApiExtractor::new(&api).extract().await.unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.get(3, "store_code"), Some(&Cell::text("AB-00000004")));
    }

    #[tokio::test]
    async fn test_zero_stores() {
        let api = FlakyApi {
            count: 0,
            failing: vec![],
        };
        let extraction = StoreApiExtractor::new(&api).pages(0).await;
        assert!(extraction.dataset.is_empty());
        assert!(extraction.failures.is_empty());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(&json!({"name": "x", "number_stores": 451})).unwrap(), 451);
        assert_eq!(parse_count(&json!(12)).unwrap(), 12);
        assert!(parse_count(&json!({"stores": 1})).is_err());
    }

    #[test]
    fn test_page_path() {
        let url = Url::parse("https://api.example.com/prod/").unwrap();
        let client = ApiClient::try_new(url, Auth::None).unwrap();
        let api = StoreApiClient::new(client, "number_stores", "store_details/");
        assert_eq!(api.page_path(7), "store_details/7");
    }
}
