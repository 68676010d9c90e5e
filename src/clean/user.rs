//! User cleaner
//!
//! Cleans the legacy user table read from the relational source.

use super::dates::DateChain;
use super::rules::{Cleaned, EntityKind, RulePipeline};
use super::step::{OnFailure, Step};
use crate::dataset::Dataset;
use crate::etl::Transformer;
use eyre::Result;

/// Columns every cleaned user row must carry
pub const USER_REQUIRED: [&str; 5] = [
    "first_name",
    "last_name",
    "email_address",
    "date_of_birth",
    "join_date",
];

/// Transformer for user records
///
/// Steps, in order:
/// 1. `"NULL"` strings become null
/// 2. rows missing a name, email or either date are dropped
/// 3. `date_of_birth` and `join_date` are parsed with the mixed chain
/// 4. `join_date` values the mixed chain rejected are retried day-first
/// 5. rows with an unparsed date are dropped
/// 6. `phone_number` is rendered as text, symbols intact
/// 7. exact duplicate rows are dropped
pub struct UserCleaner {
    pipeline: RulePipeline,
}

impl UserCleaner {
    pub fn new(expected_rows: Option<usize>) -> Self {
        let steps = vec![
            Step::normalize_sentinel("NULL"),
            Step::drop_missing(&USER_REQUIRED),
            Step::parse_date("date_of_birth", DateChain::mixed(), OnFailure::SetNull),
            Step::parse_date_with_correction(
                "join_date",
                DateChain::mixed(),
                DateChain::day_first(),
            ),
            Step::drop_missing(&["date_of_birth", "join_date"]),
            Step::stringify("phone_number"),
            Step::DedupeRows,
        ];
        Self {
            pipeline: RulePipeline::new(EntityKind::User, steps).with_expected_rows(expected_rows),
        }
    }

    pub fn pipeline(&self) -> &RulePipeline {
        &self.pipeline
    }
}

impl Transformer for UserCleaner {
    type Input = Dataset;
    type Output = Cleaned;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(self.pipeline.clean(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    fn users(rows: Vec<[&str; 7]>) -> Dataset {
        Dataset::new(
            vec![
                "first_name".into(),
                "last_name".into(),
                "email_address".into(),
                "date_of_birth".into(),
                "join_date".into(),
                "phone_number".into(),
                "country_code".into(),
            ],
            rows.into_iter()
                .map(|r| r.iter().map(|c| Value::text(*c)).collect())
                .collect(),
        )
    }

    fn sample() -> Dataset {
        users(vec![
            ["Sigfried", "Noack", "sn@example.org", "1990-09-30", "2018-10-10", "+49(0)047905356", "DE"],
            ["Guy", "Allen", "ga@example.org", "1940-12-01", "2016-12-20", "(0161) 496 0674", "GB"],
            ["Harry", "Lawrence", "hl@example.org", "1995-08-02", "25/12/2002", "(0306) 999 0871", "GB"],
            ["Harry", "Lawrence", "hl@example.org", "1995-08-02", "25/12/2002", "(0306) 999 0871", "GB"],
            ["Andreas", "Bonbach", "NULL", "1943-06-28", "2015-10-24", "0121 496 0225", "DE"],
            ["Gina", "Tate", "gt@example.org", "NULL", "2016-01-01", "0121 496 0225", "GB"],
            ["Gerd", "Baum", "gb@example.org", "GFDIE4Z7", "2001-02-03", "0121 496 0225", "DE"],
            ["Lea", "Winter", "lw@example.org", "January 1951 27", "2008 May 15", "07700 900", "DE"],
        ])
    }

    #[test]
    fn test_user_cleaning() {
        let cleaned = UserCleaner::new(None).transform(sample()).unwrap();
        let data = &cleaned.dataset;

        // NULL email, NULL date of birth, garbage date and one duplicate are gone
        assert_eq!(data.len(), 4);
        for row in 0..data.len() {
            for column in USER_REQUIRED {
                assert!(!data.get(row, column).unwrap().is_null());
            }
            assert!(data.get(row, "date_of_birth").unwrap().as_date().is_some());
            assert!(data.get(row, "join_date").unwrap().as_date().is_some());
        }

        // Day-first join date read as 25 December
        assert_eq!(
            data.get(2, "join_date").unwrap().to_string(),
            "2002-12-25"
        );
        assert_eq!(
            data.get(0, "phone_number"),
            Some(&Value::text("+49(0)047905356"))
        );
    }

    #[test]
    fn test_null_date_of_birth_dropped_before_parsing() {
        let cleaned = UserCleaner::new(None).transform(sample()).unwrap();
        let missing = &cleaned.report.steps[1];
        assert!(missing.step.starts_with("drop-missing"));
        assert_eq!(missing.dropped, 2);
    }

    #[test]
    fn test_day_first_date_of_birth_survives() {
        let data = users(vec![[
            "Mia", "Kurz", "mk@example.org", "25/12/1990", "2019-03-04", "0121 496 0225", "DE",
        ]]);
        let cleaned = UserCleaner::new(None).transform(data).unwrap();

        assert_eq!(cleaned.dataset.len(), 1);
        assert_eq!(
            cleaned.dataset.get(0, "date_of_birth").unwrap().to_string(),
            "1990-12-25"
        );
    }

    #[test]
    fn test_join_date_correction_pass() {
        let data = users(vec![[
            "Mia", "Kurz", "mk@example.org", "1990-12-25", "04 March, 2019", "0121 496 0225", "DE",
        ]]);
        let cleaned = UserCleaner::new(None).transform(data).unwrap();

        assert_eq!(
            cleaned.dataset.get(0, "join_date").unwrap().to_string(),
            "2019-03-04"
        );
    }

    #[test]
    fn test_expected_count_warning() {
        let cleaned = UserCleaner::new(Some(15_284)).transform(sample()).unwrap();
        let mismatch = cleaned.report.count_mismatch.unwrap();
        assert_eq!(mismatch.actual, 4);
        assert_eq!(mismatch.expected, 15_284);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let cleaner = UserCleaner::new(None);
        let once = cleaner.transform(sample()).unwrap().dataset;
        let twice = cleaner.transform(once.clone()).unwrap();
        assert_eq!(twice.dataset, once);
        assert_eq!(twice.report.dropped(), 0);
    }
}
