//! Integration tests for a full centralization run
//!
//! These tests drive the pipeline against a real SQLite source and
//! destination plus CSV card documents on disk. Only the store API is
//! replaced by an in-memory fake.

use eyre::Result;
use retail_centralizer::etl::{Pipeline, UploadStatus};
use retail_centralizer::source::{DocumentReader, Record, SqliteSource, StoreApi};
use retail_centralizer::{Dataset, Destination, Settings, SqliteDestination};
use rusqlite::Connection;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fake store API with ten stores; listed pages fail
struct FakeStoreApi {
    failing: Vec<usize>,
}

impl StoreApi for FakeStoreApi {
    async fn get_count(&self) -> Result<usize> {
        Ok(10)
    }

    async fn get_page(&self, index: usize) -> Result<Record> {
        if self.failing.contains(&index) {
            eyre::bail!("connection reset fetching store {}", index);
        }
        let value = json!({
            "index": index - 1,
            "address": format!("{} High Street", index),
            "longitude": "-0.1",
            "lat": null,
            "locality": "London",
            "store_code": format!("LO-{:08X}", index * 4099),
            "staff_numbers": format!("{}e", 10 + index),
            "opening_date": "2009-10-15",
            "store_type": "Local",
            "latitude": "51.5",
            "country_code": "GB",
            "continent": "Europe"
        });
        Ok(value.as_object().cloned().unwrap_or_default())
    }
}

/// Destination that refuses one table and forwards the rest to SQLite
struct PickyDestination {
    inner: SqliteDestination,
    refuse: String,
}

impl Destination for PickyDestination {
    async fn replace_table(&self, table: &str, data: &Dataset) -> Result<usize> {
        if table == self.refuse {
            eyre::bail!("disk quota exceeded");
        }
        self.inner.replace_table(table, data).await
    }
}

fn seed_source(dir: &Path) -> PathBuf {
    let path = dir.join("legacy.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE legacy_users (
            first_name TEXT, last_name TEXT, email_address TEXT,
            date_of_birth TEXT, join_date TEXT, phone_number TEXT
         );
         INSERT INTO legacy_users VALUES ('Sigfried', 'Noack', 'noack@example.com', '1990-01-02', '2018-10-10', '+49(0) 047905356');
         INSERT INTO legacy_users VALUES ('Guy', 'Allen', 'allen@example.com', '1952 January 21', '25/12/2019', '(0161) 496 0674');
         INSERT INTO legacy_users VALUES ('Harry', 'Lawrence', 'harry@example.com', 'NULL', '2020-01-01', '020 7946 0000');
         INSERT INTO legacy_users VALUES ('Sigfried', 'Noack', 'noack@example.com', '1990-01-02', '2018-10-10', '+49(0) 047905356');
         INSERT INTO legacy_users VALUES ('Bad', 'Date', 'bad@example.com', 'GMQUSXQ0', '2020-01-01', '1');
         CREATE TABLE orders_table (product_code TEXT);",
    )
    .unwrap();
    path
}

fn write_cards(dir: &Path) -> Vec<String> {
    let first = dir.join("cards_1.csv");
    let second = dir.join("cards_2.csv");
    std::fs::write(
        &first,
        "card_number,expiry_date,card_provider,date_payment_confirmed\n\
         4111-1111-1111,09/26,VISA 16 digit,2021-05-01\n\
         30060773296197,09/26,Diners Club,17/08/2015\n\
         NULL,NULL,NULL,NULL\n",
    )
    .unwrap();
    std::fs::write(
        &second,
        "card_number,expiry_date,card_provider,date_payment_confirmed\n\
         30060773296197,10/27,Diners Club,2016-01-01\n\
         VAB9DSB8ZM,10/27,VISA 13 digit,2016-01-01\n\
         349624180933183,11/25,American Express,not a date\n",
    )
    .unwrap();
    vec![first.display().to_string(), second.display().to_string()]
}

fn settings(dir: &Path) -> Settings {
    Settings {
        source_db: Some(seed_source(dir)),
        card_documents: write_cards(dir),
        target_db: dir.join("sales_data.db"),
        expected_rows: 0,
        ..Settings::default()
    }
}

fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

#[tokio::test]
async fn test_end_to_end_run() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    let target = settings.target_db.clone();

    let pipeline = Pipeline::new(
        SqliteSource::new(settings.source_db().unwrap()),
        DocumentReader::new(),
        FakeStoreApi { failing: vec![3] },
        SqliteDestination::new(&target),
        settings,
    );
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.tables, vec!["legacy_users", "orders_table"]);
    assert!(report.all_loaded());

    // Duplicate, NULL birth date and unparseable birth date are dropped
    assert_eq!(report.reports[0].input_rows, 5);
    assert_eq!(report.reports[0].output_rows, 2);
    assert_eq!(count_rows(&target, "dim_users"), 2);

    // Sentinel row, duplicate number, letters and bad payment date are dropped
    assert_eq!(report.reports[1].input_rows, 6);
    assert_eq!(report.reports[1].output_rows, 2);
    let conn = Connection::open(&target).unwrap();
    let numbers: Vec<String> = conn
        .prepare("SELECT card_number FROM dim_card_details ORDER BY card_number")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(numbers, vec!["30060773296197", "411111111111"]);

    // The corrected join date is stored as ISO text
    let join: String = conn
        .query_row(
            "SELECT join_date FROM dim_users WHERE first_name = 'Guy'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(join, "2019-12-25");

    // Page 3 failed; the other nine stores arrived
    assert_eq!(report.failed_pages.len(), 1);
    assert_eq!(report.failed_pages[0].index, 3);
    assert_eq!(count_rows(&target, "dim_store_details"), 9);
    let staff: i64 = conn
        .query_row(
            "SELECT staff_numbers FROM dim_store_details WHERE \"index\" = 0",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(staff, 11);
}

#[tokio::test]
async fn test_refused_table_does_not_block_other_uploads() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    let target = settings.target_db.clone();

    let pipeline = Pipeline::new(
        SqliteSource::new(settings.source_db().unwrap()),
        DocumentReader::new(),
        FakeStoreApi { failing: vec![] },
        PickyDestination {
            inner: SqliteDestination::new(&target),
            refuse: "dim_users".to_string(),
        },
        settings,
    );
    let report = pipeline.run().await.unwrap();

    assert!(!report.all_loaded());
    assert!(matches!(report.uploads[0].status, UploadStatus::Failed(_)));
    assert_eq!(report.uploads[1].status, UploadStatus::Loaded(2));
    assert_eq!(report.uploads[2].status, UploadStatus::Loaded(10));
    assert_eq!(count_rows(&target, "dim_store_details"), 10);
}

#[tokio::test]
async fn test_missing_user_table_aborts_run() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        user_table: "missing_users".to_string(),
        ..settings(dir.path())
    };
    let target = settings.target_db.clone();

    let pipeline = Pipeline::new(
        SqliteSource::new(settings.source_db().unwrap()),
        DocumentReader::new(),
        FakeStoreApi { failing: vec![] },
        SqliteDestination::new(&target),
        settings,
    );
    let error = pipeline.run().await.unwrap_err();

    assert!(format!("{:#}", error).contains("stage extract-user failed"));
    assert!(!target.exists());
}
