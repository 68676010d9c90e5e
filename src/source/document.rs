//! Tabular document source
//!
//! Reads CSV and JSON documents from local paths, `http(s)://` URLs or
//! `s3://bucket/key` locations. S3 locations are fetched through the
//! bucket's public HTTPS endpoint.

use super::{DocumentSource, Record};
use crate::dataset::{Dataset, Value};
use crate::etl::Extractor;
use eyre::{Context, Result, eyre};
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::path::PathBuf;
use url::Url;

/// Supported document layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Csv,
    Json,
}

impl DocumentFormat {
    /// Guess the format from the location's extension
    pub fn detect(location: &str) -> Result<Self> {
        let name = location
            .split(['?', '#'])
            .next()
            .unwrap_or(location)
            .to_lowercase();
        if name.ends_with(".csv") {
            Ok(Self::Csv)
        } else if name.ends_with(".json") {
            Ok(Self::Json)
        } else {
            Err(eyre!(
                "Unsupported document format for {} (expected .csv or .json)",
                location
            ))
        }
    }
}

/// Where a document lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Local(PathBuf),
    Remote(Url),
}

impl Location {
    fn parse(location: &str) -> Result<Self> {
        if let Some(rest) = location.strip_prefix("s3://") {
            let (bucket, key) = rest
                .split_once('/')
                .ok_or_else(|| eyre!("S3 location has no key: {}", location))?;
            let url = format!("https://{}.s3.amazonaws.com/{}", bucket, key);
            return Url::parse(&url)
                .map(Self::Remote)
                .with_context(|| format!("Invalid S3 location: {}", location));
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return Url::parse(location)
                .map(Self::Remote)
                .with_context(|| format!("Invalid URL: {}", location));
        }
        Ok(Self::Local(PathBuf::from(location)))
    }
}

/// Reads tabular documents into datasets
#[derive(Debug, Clone, Default)]
pub struct DocumentReader {
    client: Client,
}

impl DocumentReader {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<u8>> {
        match location {
            Location::Local(path) => std::fs::read(path)
                .with_context(|| format!("Failed to read document: {}", path.display())),
            Location::Remote(url) => {
                log::debug!("Downloading {}", url);
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("Failed to download {}", url))?;
                if !response.status().is_success() {
                    eyre::bail!("Failed to download {} ({})", url, response.status());
                }
                let bytes = response
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read body of {}", url))?;
                Ok(bytes.to_vec())
            }
        }
    }
}

impl DocumentSource for DocumentReader {
    async fn extract(&self, location: &str) -> Result<Vec<Dataset>> {
        let format = DocumentFormat::detect(location)?;
        let bytes = self.fetch(&Location::parse(location)?).await?;
        let table = match format {
            DocumentFormat::Csv => parse_csv(&bytes),
            DocumentFormat::Json => parse_json(&bytes),
        }
        .with_context(|| format!("Failed to parse document {}", location))?;
        Ok(vec![table])
    }
}

/// Parse CSV with a header row; empty cells become null
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| "Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut data = Dataset::new(columns, Vec::new());
    for record in reader.records() {
        let record = record.with_context(|| "Failed to read CSV record")?;
        data.push_row(
            record
                .iter()
                .map(|cell| match cell.trim() {
                    "" => Value::Null,
                    _ => Value::text(cell),
                })
                .collect(),
        );
    }
    Ok(data)
}

/// Parse JSON as either an array of records or a column-oriented object.
///
/// Column-oriented documents look like `{"col": {"0": v, "1": v}}`; rows
/// are ordered by their numeric key.
pub fn parse_json(bytes: &[u8]) -> Result<Dataset> {
    let value: JsonValue = serde_json::from_slice(bytes).with_context(|| "Invalid JSON")?;
    match value {
        JsonValue::Array(items) => {
            let records = items
                .into_iter()
                .map(|item| match item {
                    JsonValue::Object(map) => Ok(map),
                    other => Err(eyre!("Expected a JSON object, found {}", other)),
                })
                .collect::<Result<Vec<Record>>>()?;
            Ok(Dataset::from_records(&records))
        }
        JsonValue::Object(map) if !map.is_empty() && map.values().all(JsonValue::is_object) => {
            let mut keys: BTreeSet<(u64, String)> = BTreeSet::new();
            for column in map.values().filter_map(JsonValue::as_object) {
                for key in column.keys() {
                    keys.insert((key.parse().unwrap_or(u64::MAX), key.clone()));
                }
            }
            let columns: Vec<String> = map.keys().cloned().collect();
            let rows = keys
                .iter()
                .map(|(_, key)| {
                    map.values()
                        .map(|column| {
                            column
                                .get(key)
                                .map(Value::from_json)
                                .unwrap_or(Value::Null)
                        })
                        .collect()
                })
                .collect();
            Ok(Dataset::new(columns, rows))
        }
        JsonValue::Object(map) => Ok(Dataset::from_records(&[map])),
        other => Err(eyre!("Expected a JSON array or object, found {}", other)),
    }
}

/// Extracts and concatenates the tables of one or more documents
pub struct DocumentExtractor<'a, D> {
    source: &'a D,
    locations: Vec<String>,
}

impl<'a, D: DocumentSource> DocumentExtractor<'a, D> {
    pub fn new(source: &'a D, locations: Vec<String>) -> Self {
        Self { source, locations }
    }
}

impl<D: DocumentSource> Extractor for DocumentExtractor<'_, D> {
    async fn extract(&self) -> Result<Dataset> {
        let mut tables = Vec::new();
        for location in &self.locations {
            log::debug!("Reading document {}", location);
            let parts = self
                .source
                .extract(location)
                .await
                .with_context(|| format!("Failed to extract document {}", location))?;
            log::debug!("{} yielded {} table(s)", location, parts.len());
            tables.extend(parts);
        }
        let data = Dataset::concat(tables);
        log::info!(
            "Extracted {} row(s) from {} document(s)",
            data.len(),
            self.locations.len()
        );
        Ok(data)
    }
}
