//! CLI helper functions

use crate::{
    clean::{CardCleaner, Cleaned, EntityKind, StoreCleaner, UserCleaner},
    client::{ApiClient, Auth},
    config::Settings,
    dataset::Dataset,
    etl::{Extractor, Pipeline, RunReport, Transformer},
    sink::SqliteDestination,
    source::{
        DocumentExtractor, DocumentReader, RelationalSource, SqliteSource, StoreApiClient,
    },
};
use eyre::{Context, Result};

/// A pipeline wired to the production collaborators
pub type CentralizerPipeline =
    Pipeline<SqliteSource, DocumentReader, StoreApiClient, SqliteDestination>;

/// Build the store API client from settings
///
/// Requires `store_api.base_url`; the API key is optional.
pub fn load_store_api(settings: &Settings) -> Result<StoreApiClient> {
    let url = settings.store_api_url()?;
    let auth = Auth::new(settings.store_api.api_key.clone());
    log::debug!("Store API at {} using {} auth", url, auth);
    let client = ApiClient::try_new(url, auth).context("Failed to create store API client")?;
    Ok(StoreApiClient::new(
        client,
        &settings.store_api.count_endpoint,
        &settings.store_api.details_endpoint,
    ))
}

/// Wire the production collaborators into a pipeline
pub fn build_pipeline(settings: Settings) -> Result<CentralizerPipeline> {
    let source = SqliteSource::new(settings.source_db()?);
    let stores = load_store_api(&settings)?;
    let destination = SqliteDestination::new(&settings.target_db);
    Ok(Pipeline::new(
        source,
        DocumentReader::new(),
        stores,
        destination,
        settings,
    ))
}

/// Run the full pipeline: extract, clean and upload all three datasets
pub async fn run_pipeline(settings: Settings) -> Result<RunReport> {
    log::info!("Centralizing into {}", settings.target_db.display());
    let pipeline = build_pipeline(settings)?;
    pipeline.run().await
}

/// List the tables of the relational source
pub async fn list_tables(settings: &Settings) -> Result<Vec<String>> {
    let source = SqliteSource::new(settings.source_db()?);
    source.list_tables().await
}

/// Clean an in-memory dataset as `entity`
pub fn clean_dataset(
    entity: EntityKind,
    data: Dataset,
    expected_rows: Option<usize>,
) -> Result<Cleaned> {
    match entity {
        EntityKind::User => UserCleaner::new(expected_rows).transform(data),
        EntityKind::Card => CardCleaner::new(expected_rows).transform(data),
        EntityKind::Store => StoreCleaner::new()?.transform(data),
    }
}

/// Clean a CSV or JSON document as `entity` without uploading it
pub async fn clean_document(
    entity: EntityKind,
    location: &str,
    expected_rows: Option<usize>,
) -> Result<Cleaned> {
    let reader = DocumentReader::new();
    let raw = DocumentExtractor::new(&reader, vec![location.to_string()])
        .extract()
        .await
        .with_context(|| format!("Failed to read {} data from {}", entity, location))?;
    clean_dataset(entity, raw, expected_rows)
}
