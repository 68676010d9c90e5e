//! Card cleaner

use super::dates::DateChain;
use super::rules::{Cleaned, EntityKind, RulePipeline};
use super::step::{OnFailure, Step};
use crate::dataset::Dataset;
use crate::etl::Transformer;
use eyre::Result;

pub const CARD_REQUIRED: [&str; 4] = [
    "card_number",
    "expiry_date",
    "card_provider",
    "date_payment_confirmed",
];

/// Transformer for payment card records
///
/// Drops incomplete rows and repeated card numbers, strips separators from
/// card numbers (rejecting anything else that is not a digit) and parses the
/// payment confirmation date with the payment chain, dropping rows it cannot
/// read. Card numbers are deduplicated a second time after normalization so
/// `4111-1111` and `41111111` cannot both survive.
pub struct CardCleaner {
    pipeline: RulePipeline,
}

impl CardCleaner {
    pub fn new(expected_rows: Option<usize>) -> Self {
        let steps = vec![
            Step::normalize_sentinel("NULL"),
            Step::drop_missing(&CARD_REQUIRED),
            Step::dedupe_by("card_number"),
            Step::normalize_card_number("card_number"),
            Step::parse_date(
                "date_payment_confirmed",
                DateChain::payment(),
                OnFailure::DropRow,
            ),
            Step::dedupe_by("card_number"),
        ];
        Self {
            pipeline: RulePipeline::new(EntityKind::Card, steps).with_expected_rows(expected_rows),
        }
    }

    pub fn pipeline(&self) -> &RulePipeline {
        &self.pipeline
    }
}

impl Transformer for CardCleaner {
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
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn cards(rows: Vec<[&str; 4]>) -> Dataset {
        Dataset::new(
            CARD_REQUIRED.iter().map(|c| c.to_string()).collect(),
            rows.into_iter()
                .map(|r| r.iter().map(|c| Value::text(*c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_separator_card_number_and_iso_date() {
        let data = cards(vec![["4111-1111-1111", "09/26", "VISA 16 digit", "2021-05-01"]]);
        let cleaned = CardCleaner::new(None).transform(data).unwrap().dataset;

        assert_eq!(cleaned.len(), 1);
        assert_eq!(
            cleaned.get(0, "card_number"),
            Some(&Value::text("411111111111"))
        );
        assert_eq!(
            cleaned.get(0, "date_payment_confirmed"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2021, 5, 1).unwrap()))
        );
    }

    #[test]
    fn test_card_cleaning_rules() {
        let data = cards(vec![
            ["30060773296197", "09/26", "Diners Club / Carte Blanche", "2015-11-25"],
            ["30060773296197", "10/27", "Diners Club / Carte Blanche", "2016-01-01"],
            ["???4971858637664481", "09/23", "VISA 16 digit", "2001 October 21"],
            ["NB71VBAHJE", "NB71VBAHJE", "NB71VBAHJE", "NB71VBAHJE"],
            ["NULL", "NULL", "NULL", "NULL"],
            ["6011842569452197", "04/29", "Discover", "not a date"],
            ["4252720361802860", "11/29", "VISA 16 digit", "2017/08/31"],
        ]);
        let cleaned = CardCleaner::new(Some(15_284)).transform(data).unwrap();
        let data = &cleaned.dataset;

        assert_eq!(data.len(), 3);
        let numbers: Vec<&str> = data
            .column("card_number")
            .unwrap()
            .into_iter()
            .map(|v| v.as_text().unwrap())
            .collect();
        assert_eq!(
            numbers,
            vec!["30060773296197", "4971858637664481", "4252720361802860"]
        );
        assert!(numbers.iter().all(|n| n.chars().all(|c| c.is_ascii_digit())));
        assert_eq!(numbers.iter().collect::<HashSet<_>>().len(), numbers.len());
        assert!(cleaned.report.count_mismatch.is_some());
    }

    #[test]
    fn test_collisions_after_normalization_are_removed() {
        let data = cards(vec![
            ["4111-1111", "01/30", "VISA 16 digit", "2020-01-01"],
            ["41111111", "01/30", "VISA 16 digit", "2020-01-02"],
        ]);
        let cleaned = CardCleaner::new(None).transform(data).unwrap().dataset;
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let cleaner = CardCleaner::new(None);
        let data = cards(vec![
            ["4111-1111-1111", "09/26", "VISA 16 digit", "2021-05-01"],
            ["3528", "02/24", "JCB 16 digit", "12/25/2019"],
        ]);
        let once = cleaner.transform(data).unwrap().dataset;
        let twice = cleaner.transform(once.clone()).unwrap();
        assert_eq!(twice.dataset, once);
        assert_eq!(twice.report.dropped(), 0);
    }
}
