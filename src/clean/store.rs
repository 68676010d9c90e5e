//! Store cleaner

use super::dates::DateChain;
use super::rules::{Cleaned, EntityKind, RulePipeline};
use super::step::{OnFailure, Step};
use crate::dataset::Dataset;
use crate::etl::Transformer;
use eyre::Result;

/// Two or three letters, a hyphen, then eight alphanumerics
pub const STORE_CODE_PATTERN: &str = r"^[A-Za-z]{2,3}-[A-Za-z0-9]{8}$";

/// Redundant copy of `latitude` some store payloads carry
pub const REDUNDANT_LATITUDE: &str = "lat";

/// Transformer for store records
///
/// Rows with a malformed `store_code` are dropped, then repeated codes keep
/// their first row. Store counts change over time, so there is no expected
/// row count.
/// Unparseable opening dates and staff numbers become null without removing
/// the row; only rows null in every column are dropped at the end.
pub struct StoreCleaner {
    pipeline: RulePipeline,
}

impl StoreCleaner {
    pub fn new() -> Result<Self> {
        let steps = vec![
            Step::drop_column(REDUNDANT_LATITUDE),
            Step::match_pattern("store_code", STORE_CODE_PATTERN)?,
            Step::dedupe_by("store_code"),
            Step::parse_date("opening_date", DateChain::payment(), OnFailure::SetNull),
            Step::leading_integer("staff_numbers"),
            Step::DropEmptyRows,
        ];
        Ok(Self {
            pipeline: RulePipeline::new(EntityKind::Store, steps),
        })
    }

    pub fn pipeline(&self) -> &RulePipeline {
        &self.pipeline
    }
}

impl Transformer for StoreCleaner {
    type Input = Dataset;
    type Output = Cleaned;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(self.pipeline.clean(input))
    }
}
