//! Run configuration
//!
//! Settings are resolved in three layers, later layers winning:
//! 1. built-in defaults
//! 2. an optional YAML file (every key optional)
//! 3. `RDC_*` environment variables, usually sourced from a `.env` file
//!
//! Example `rdc.yml`:
//! ```yaml
//! source_db: legacy.db
//! user_table: legacy_users
//! card_documents:
//!   - s3://data-handling-public/card_details.csv
//! store_api:
//!   base_url: https://api.example.com/prod/
//!   api_key: secret
//! target_db: sales_data.db
//! expected_rows: 15284
//! ```

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Row count the user and card snapshots are expected to clean down to
pub const DEFAULT_EXPECTED_ROWS: usize = 15_284;

/// Store API endpoints and credentials
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreApiSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub count_endpoint: String,
    pub details_endpoint: String,
}

impl Default for StoreApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            count_endpoint: "number_stores".to_string(),
            details_endpoint: "store_details".to_string(),
        }
    }
}

/// Target table names in the destination database
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub users: String,
    pub cards: String,
    pub stores: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            users: "dim_users".to_string(),
            cards: "dim_card_details".to_string(),
            stores: "dim_store_details".to_string(),
        }
    }
}

/// Everything a pipeline run needs to reach its sources and destination
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source_db: Option<PathBuf>,
    pub user_table: String,
    pub card_documents: Vec<String>,
    pub store_api: StoreApiSettings,
    pub target_db: PathBuf,
    pub tables: TableNames,
    /// `0` disables the row-count check
    pub expected_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_db: None,
            user_table: "legacy_users".to_string(),
            card_documents: vec!["card_details.csv".to_string()],
            store_api: StoreApiSettings::default(),
            target_db: PathBuf::from("sales_data.db"),
            tables: TableNames::default(),
            expected_rows: DEFAULT_EXPECTED_ROWS,
        }
    }
}

impl Settings {
    /// Resolve settings from defaults, an optional YAML file and the environment
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut settings = match config {
            Some(path) if path.exists() => {
                log::debug!("Loading settings from {}", path.display());
                Self::read(path)?
            }
            Some(path) => {
                log::debug!("No settings file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Read settings from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read settings file: {}", path.as_ref().display())
        })?;
        serde_yaml::from_str(&content).with_context(|| "Failed to parse settings YAML")
    }

    /// Override fields from `RDC_*` variables returned by `get`
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = get("RDC_SOURCE_DB") {
            self.source_db = Some(PathBuf::from(v));
        }
        if let Some(v) = get("RDC_USER_TABLE") {
            self.user_table = v;
        }
        if let Some(v) = get("RDC_CARD_DOCUMENTS") {
            self.card_documents = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("RDC_STORE_API_URL") {
            self.store_api.base_url = Some(v);
        }
        if let Some(v) = get("RDC_STORE_API_KEY") {
            self.store_api.api_key = Some(v);
        }
        if let Some(v) = get("RDC_TARGET_DB") {
            self.target_db = PathBuf::from(v);
        }
        if let Some(v) = get("RDC_EXPECTED_ROWS") {
            self.expected_rows = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid RDC_EXPECTED_ROWS: {}", v))?;
        }
        Ok(())
    }

    /// The advisory row count, if enabled
    pub fn expected(&self) -> Option<usize> {
        match self.expected_rows {
            0 => None,
            n => Some(n),
        }
    }

    /// Path of the relational source database
    pub fn source_db(&self) -> Result<&Path> {
        self.source_db
            .as_deref()
            .ok_or_else(|| eyre!("No source database configured (set RDC_SOURCE_DB)"))
    }

    /// Base URL of the store API
    pub fn store_api_url(&self) -> Result<Url> {
        let raw = self
            .store_api
            .base_url
            .as_deref()
            .ok_or_else(|| eyre!("No store API URL configured (set RDC_STORE_API_URL)"))?;
        Url::parse(raw).with_context(|| format!("Invalid store API URL: {}", raw))
    }
}
