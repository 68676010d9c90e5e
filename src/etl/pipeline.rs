//! Run orchestration
//!
//! A run walks a fixed sequence of [`Stage`]s. Every stage up to and
//! including `clean-store` is fail-fast: the first error aborts the run,
//! wrapped with the name of the stage it came from. The final `load-all`
//! stage is different. Each of the three uploads is attempted on its own
//! and its outcome recorded, so one rejected table never stops the others.

use super::{Extractor, Loader, Transformer};
use crate::clean::{CardCleaner, CleanReport, Cleaned, StoreCleaner, UserCleaner};
use crate::config::Settings;
use crate::dataset::Dataset;
use crate::sink::{Destination, TableLoader};
use crate::source::{
    DocumentExtractor, DocumentSource, PageFailure, PagedExtraction, RelationalSource, StoreApi,
    StoreApiExtractor, TableExtractor,
};
use eyre::Result;
use owo_colors::OwoColorize;
use std::fmt;
use std::future::Future;

/// Ordered stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ListTables,
    ExtractUser,
    CleanUser,
    ExtractCard,
    CleanCard,
    ExtractStoreCount,
    ExtractStorePages,
    CleanStore,
    LoadAll,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::ListTables,
        Stage::ExtractUser,
        Stage::CleanUser,
        Stage::ExtractCard,
        Stage::CleanCard,
        Stage::ExtractStoreCount,
        Stage::ExtractStorePages,
        Stage::CleanStore,
        Stage::LoadAll,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ListTables => "list-tables",
            Stage::ExtractUser => "extract-user",
            Stage::CleanUser => "clean-user",
            Stage::ExtractCard => "extract-card",
            Stage::CleanCard => "clean-card",
            Stage::ExtractStoreCount => "extract-store-count",
            Stage::ExtractStorePages => "extract-store-pages",
            Stage::CleanStore => "clean-store",
            Stage::LoadAll => "load-all",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of uploading one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Loaded(usize),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub table: String,
    pub status: UploadStatus,
}

impl UploadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, UploadStatus::Loaded(_))
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            UploadStatus::Loaded(rows) => write!(f, "{}: loaded {} row(s)", self.table, rows),
            UploadStatus::Failed(error) => write!(f, "{}: FAILED {}", self.table, error),
        }
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Tables listed by the relational source
    pub tables: Vec<String>,
    /// Cleaning summaries in user, card, store order
    pub reports: Vec<CleanReport>,
    pub failed_pages: Vec<PageFailure>,
    pub uploads: Vec<UploadOutcome>,
}

impl RunReport {
    /// True when every table was uploaded
    pub fn all_loaded(&self) -> bool {
        self.uploads.iter().all(UploadOutcome::is_loaded)
    }

    pub fn failed_uploads(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.uploads.iter().filter(|u| !u.is_loaded())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source tables: {}", self.tables.join(", "))?;
        for report in &self.reports {
            writeln!(f, "{}", report)?;
        }
        if !self.failed_pages.is_empty() {
            writeln!(f, "Failed store pages: {}", self.failed_pages.len())?;
            for page in &self.failed_pages {
                writeln!(f, "  {}", page)?;
            }
        }
        for upload in &self.uploads {
            writeln!(f, "{}", upload)?;
        }
        Ok(())
    }
}

/// Run `work` as `stage`, logging it and tagging any error with the stage
async fn stage<T>(stage: Stage, work: impl Future<Output = Result<T>>) -> Result<T> {
    log::info!("Stage {}", stage.cyan());
    work.await.map_err(|e| {
        log::error!("Stage {} failed: {:#}", stage, e);
        e.wrap_err(format!("stage {} failed", stage))
    })
}

/// Centralizes users, cards and stores into one destination
///
/// # Type Parameters
/// - `R`: relational source holding the user table
/// - `D`: document source holding the card documents
/// - `A`: store API
/// - `W`: destination database
#[derive(Debug)]
pub struct Pipeline<R, D, A, W> {
    relational: R,
    documents: D,
    stores: A,
    destination: W,
    settings: Settings,
}

impl<R, D, A, W> Pipeline<R, D, A, W>
where
    R: RelationalSource,
    D: DocumentSource,
    A: StoreApi,
    W: Destination,
{
    pub fn new(relational: R, documents: D, stores: A, destination: W, settings: Settings) -> Self {
        Self {
            relational,
            documents,
            stores,
            destination,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn destination(&self) -> &W {
        &self.destination
    }

    /// Run every stage in order
    ///
    /// # Errors
    /// Returns the first extraction or cleaning failure. Upload failures
    /// are reported in [`RunReport::uploads`] instead.
    pub async fn run(&self) -> Result<RunReport> {
        log::info!("Starting centralization run");
        let settings = &self.settings;
        let expected = settings.expected();

        let tables = stage(Stage::ListTables, self.relational.list_tables()).await?;
        log::info!("Source has {} table(s): {}", tables.len(), tables.join(", "));
        if !tables.contains(&settings.user_table) {
            log::warn!(
                "User table {} is not among the listed tables",
                settings.user_table
            );
        }

        let raw_users = stage(
            Stage::ExtractUser,
            TableExtractor::new(&self.relational, &settings.user_table).extract(),
        )
        .await?;
        let users = stage(Stage::CleanUser, async {
            UserCleaner::new(expected).transform(raw_users)
        })
        .await?;

        let raw_cards = stage(
            Stage::ExtractCard,
            DocumentExtractor::new(&self.documents, settings.card_documents.clone()).extract(),
        )
        .await?;
        let cards = stage(Stage::CleanCard, async {
            CardCleaner::new(expected).transform(raw_cards)
        })
        .await?;

        let store_extractor = StoreApiExtractor::new(&self.stores);
        let count = stage(Stage::ExtractStoreCount, store_extractor.count()).await?;
        let PagedExtraction {
            dataset: raw_stores,
            failures: failed_pages,
        } = stage(Stage::ExtractStorePages, async {
            Ok(store_extractor.pages(count).await)
        })
        .await?;
        let stores = stage(Stage::CleanStore, async {
            StoreCleaner::new()?.transform(raw_stores)
        })
        .await?;

        log::info!("Stage {}", Stage::LoadAll.cyan());
        let reports = vec![
            users.report.clone(),
            cards.report.clone(),
            stores.report.clone(),
        ];
        let uploads = self.load_all(users, cards, stores).await;

        let report = RunReport {
            tables,
            reports,
            failed_pages,
            uploads,
        };
        match report.all_loaded() {
            true => log::info!("Run complete"),
            false => log::warn!(
                "Run complete with {} failed upload(s)",
                report.failed_uploads().count()
            ),
        }
        Ok(report)
    }

    async fn load_all(&self, users: Cleaned, cards: Cleaned, stores: Cleaned) -> Vec<UploadOutcome> {
        let tables = &self.settings.tables;
        let mut outcomes = Vec::with_capacity(3);
        for (table, data) in [
            (&tables.users, users.dataset),
            (&tables.cards, cards.dataset),
            (&tables.stores, stores.dataset),
        ] {
            outcomes.push(self.upload(table, data).await);
        }
        outcomes
    }

    async fn upload(&self, table: &str, data: Dataset) -> UploadOutcome {
        let status = match TableLoader::new(&self.destination, table).load(data).await {
            Ok(rows) => UploadStatus::Loaded(rows),
            Err(e) => {
                log::warn!("Upload of {} failed: {:#}", table.bright_black(), e);
                UploadStatus::Failed(format!("{:#}", e))
            }
        };
        UploadOutcome {
            table: table.to_string(),
            status,
        }
    }
}
