//! Composable cleaning steps
//!
//! Each [`Step`] rewrites a [`Dataset`] in place and reports how many rows it
//! removed. Steps never add rows.

use super::dates::DateChain;
use crate::dataset::{Dataset, Row, Value};
use eyre::{Context, Result};
use regex::Regex;
use std::collections::HashSet;

/// What [`Step::ParseDate`] does with a value no format matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Replace the cell with null and keep the row
    SetNull,
    /// Remove the row
    DropRow,
}

/// A single cleaning rule
#[derive(Debug, Clone)]
pub enum Step {
    /// Replace text cells equal to the sentinel (after trimming) with null
    NormalizeSentinel { sentinel: String },
    /// Drop rows with a null in any of the columns
    DropMissing { columns: Vec<String> },
    /// Parse a column into dates, optionally retrying failures with a second chain
    ParseDate {
        column: String,
        chain: DateChain,
        correction: Option<DateChain>,
        on_failure: OnFailure,
    },
    /// Drop exact full-row duplicates, keeping the first occurrence
    DedupeRows,
    /// Drop rows whose key column repeats an earlier row, keeping the first
    DedupeBy { column: String },
    /// Normalize card numbers, dropping rows that are not purely numeric.
    ///
    /// Whitespace, `-` and `?` are removed wherever they occur; what remains
    /// must be all digits. `4111-1111-1111` becomes `411111111111` and
    /// `4111A1111` is dropped.
    NormalizeCardNumber { column: String },
    /// Drop rows whose column does not match the pattern
    MatchPattern { column: String, pattern: Regex },
    /// Remove a column if it exists
    DropColumn { column: String },
    /// Keep the leading run of digits as an integer, null otherwise
    LeadingInteger { column: String },
    /// Render every non-null value of a column as text
    Stringify { column: String },
    /// Drop rows that are null in every column
    DropEmptyRows,
}

/// Characters removed from card numbers before validation
const CARD_SEPARATORS: [char; 2] = ['-', '?'];

impl Step {
    pub fn normalize_sentinel(sentinel: impl Into<String>) -> Self {
        Self::NormalizeSentinel {
            sentinel: sentinel.into(),
        }
    }

    pub fn drop_missing(columns: &[&str]) -> Self {
        Self::DropMissing {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn parse_date(column: &str, chain: DateChain, on_failure: OnFailure) -> Self {
        Self::ParseDate {
            column: column.to_string(),
            chain,
            correction: None,
            on_failure,
        }
    }

    /// Parse with `chain`, then retry values it rejected with `correction`
    pub fn parse_date_with_correction(
        column: &str,
        chain: DateChain,
        correction: DateChain,
    ) -> Self {
        Self::ParseDate {
            column: column.to_string(),
            chain,
            correction: Some(correction),
            on_failure: OnFailure::SetNull,
        }
    }

    pub fn dedupe_by(column: &str) -> Self {
        Self::DedupeBy {
            column: column.to_string(),
        }
    }

    pub fn normalize_card_number(column: &str) -> Self {
        Self::NormalizeCardNumber {
            column: column.to_string(),
        }
    }

    pub fn match_pattern(column: &str, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid pattern for {}: {}", column, pattern))?;
        Ok(Self::MatchPattern {
            column: column.to_string(),
            pattern,
        })
    }

    pub fn drop_column(column: &str) -> Self {
        Self::DropColumn {
            column: column.to_string(),
        }
    }

    pub fn leading_integer(column: &str) -> Self {
        Self::LeadingInteger {
            column: column.to_string(),
        }
    }

    pub fn stringify(column: &str) -> Self {
        Self::Stringify {
            column: column.to_string(),
        }
    }

    /// Short name used in reports and logs
    pub fn name(&self) -> String {
        match self {
            Self::NormalizeSentinel { sentinel } => format!("normalize-sentinel({})", sentinel),
            Self::DropMissing { columns } => format!("drop-missing({})", columns.join(",")),
            Self::ParseDate { column, chain, .. } => {
                format!("parse-date({}, {})", column, chain.name())
            }
            Self::DedupeRows => "dedupe-rows".to_string(),
            Self::DedupeBy { column } => format!("dedupe-by({})", column),
            Self::NormalizeCardNumber { column } => format!("card-number({})", column),
            Self::MatchPattern { column, .. } => format!("match-pattern({})", column),
            Self::DropColumn { column } => format!("drop-column({})", column),
            Self::LeadingInteger { column } => format!("leading-integer({})", column),
            Self::Stringify { column } => format!("stringify({})", column),
            Self::DropEmptyRows => "drop-empty-rows".to_string(),
        }
    }

    /// Apply the step, returning the number of rows removed
    pub fn apply(&self, data: &mut Dataset) -> usize {
        match self {
            Self::NormalizeSentinel { sentinel } => {
                data.map_cells(|cell| match cell {
                    Value::Text(ref s) if s.trim() == sentinel.as_str() => Value::Null,
                    other => other,
                });
                0
            }
            Self::DropMissing { columns } => drop_missing(data, columns),
            Self::ParseDate {
                column,
                chain,
                correction,
                on_failure,
            } => parse_date(data, column, chain, correction.as_ref(), *on_failure),
            Self::DedupeRows => {
                let mut seen: HashSet<Row> = HashSet::new();
                data.retain_rows(|row| seen.insert(row.to_vec()))
            }
            Self::DedupeBy { column } => {
                let Some(idx) = required_column(data, column) else {
                    return 0;
                };
                let mut seen: HashSet<Value> = HashSet::new();
                data.retain_rows(|row| seen.insert(row[idx].clone()))
            }
            Self::NormalizeCardNumber { column } => {
                data.map_column(column, |cell| match card_digits(&cell) {
                    Some(digits) => Value::Text(digits),
                    None => Value::Null,
                });
                let Some(idx) = required_column(data, column) else {
                    return data.retain_rows(|_| false);
                };
                data.retain_rows(|row| !row[idx].is_null())
            }
            Self::MatchPattern { column, pattern } => {
                let Some(idx) = required_column(data, column) else {
                    return data.retain_rows(|_| false);
                };
                data.retain_rows(|row| match &row[idx] {
                    Value::Text(s) => pattern.is_match(s),
                    _ => false,
                })
            }
            Self::DropColumn { column } => {
                if data.drop_column(column) {
                    log::debug!("Dropped column {}", column);
                }
                0
            }
            Self::LeadingInteger { column } => {
                data.map_column(column, leading_integer);
                0
            }
            Self::Stringify { column } => {
                data.map_column(column, |cell| match cell {
                    Value::Null => Value::Null,
                    Value::Text(s) => Value::Text(s),
                    other => Value::Text(other.to_string()),
                });
                0
            }
            Self::DropEmptyRows => data.retain_rows(|row| row.iter().any(|c| !c.is_null())),
        }
    }
}

fn required_column(data: &Dataset, column: &str) -> Option<usize> {
    let idx = data.column_index(column);
    if idx.is_none() {
        log::warn!("Column {} is missing from the dataset", column);
    }
    idx
}

fn drop_missing(data: &mut Dataset, columns: &[String]) -> usize {
    let mut indexes = Vec::with_capacity(columns.len());
    for column in columns {
        match required_column(data, column) {
            Some(idx) => indexes.push(idx),
            // An absent column is null in every row
            None => return data.retain_rows(|_| false),
        }
    }
    data.retain_rows(|row| indexes.iter().all(|&i| !row[i].is_null()))
}

fn parse_date(
    data: &mut Dataset,
    column: &str,
    chain: &DateChain,
    correction: Option<&DateChain>,
    on_failure: OnFailure,
) -> usize {
    let Some(idx) = required_column(data, column) else {
        return match on_failure {
            OnFailure::DropRow => data.retain_rows(|_| false),
            OnFailure::SetNull => 0,
        };
    };

    // Keep the raw text of rejected cells so the correction pass can see it
    let mut rejected: Vec<(usize, Value)> = Vec::new();
    let mut parsed: Vec<Value> = Vec::with_capacity(data.len());
    for (i, row) in data.rows().iter().enumerate() {
        match chain.parse_value(&row[idx]) {
            Some(d) => parsed.push(Value::Date(d)),
            None => {
                if !row[idx].is_null() {
                    rejected.push((i, row[idx].clone()));
                }
                parsed.push(Value::Null);
            }
        }
    }

    if let Some(correction) = correction {
        if !rejected.is_empty() {
            log::info!(
                "Found {} row(s) with date issues in {}, attempting {} correction",
                rejected.len(),
                column,
                correction.name()
            );
            let mut fixed = 0;
            for (i, raw) in &rejected {
                if let Some(d) = correction.parse_value(raw) {
                    parsed[*i] = Value::Date(d);
                    fixed += 1;
                }
            }
            log::debug!("Corrected {} of {} {} value(s)", fixed, rejected.len(), column);
        }
    }

    let mut values = parsed.into_iter();
    data.map_column(column, |_| values.next().unwrap_or(Value::Null));

    match on_failure {
        OnFailure::SetNull => 0,
        OnFailure::DropRow => data.retain_rows(|row| !row[idx].is_null()),
    }
}

/// Digits of a card number with separators removed, if nothing else remains
fn card_digits(cell: &Value) -> Option<String> {
    let raw = match cell {
        Value::Text(s) => s.clone(),
        Value::Integer(i) if *i >= 0 => i.to_string(),
        _ => return None,
    };
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CARD_SEPARATORS.contains(c))
        .collect();
    let leading = digits.len() - digits.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if leading == 0 || leading != digits.len() {
        return None;
    }
    Some(digits)
}

fn leading_integer(cell: Value) -> Value {
    match cell {
        Value::Integer(i) => Value::Integer(i),
        Value::Real(r) if r.fract() == 0.0 => Value::Integer(r as i64),
        Value::Text(s) => {
            let s = s.trim();
            let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
            s[..end]
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_normalize_sentinel() {
        let mut data = dataset(&["a", "b"], vec![vec!["NULL".into(), " NULL ".into()]]);
        let dropped = Step::normalize_sentinel("NULL").apply(&mut data);
        assert_eq!(dropped, 0);
        assert_eq!(data.rows(), &[vec![Value::Null, Value::Null]]);
    }

    #[test]
    fn test_drop_missing_absent_column_drops_everything() {
        let mut data = dataset(&["a"], vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
        let dropped = Step::drop_missing(&["a", "b"]).apply(&mut data);
        assert_eq!(dropped, 2);
        assert!(data.is_empty());
    }

    #[test]
    fn test_parse_date_with_correction() {
        let mut data = dataset(
            &["join_date"],
            vec![
                vec!["2001-02-03".into()],
                vec!["25/12/1999".into()],
                vec!["not a date".into()],
            ],
        );
        let step = Step::parse_date_with_correction(
            "join_date",
            DateChain::mixed(),
            DateChain::day_first(),
        );
        assert_eq!(step.apply(&mut data), 0);

        let column = data.column("join_date").unwrap();
        assert_eq!(
            column[0],
            &Value::Date(NaiveDate::from_ymd_opt(2001, 2, 3).unwrap())
        );
        assert_eq!(
            column[1],
            &Value::Date(NaiveDate::from_ymd_opt(1999, 12, 25).unwrap())
        );
        assert_eq!(column[2], &Value::Null);
    }

    #[test]
    fn test_parse_date_drop_row() {
        let mut data = dataset(
            &["date_payment_confirmed"],
            vec![vec!["2021-05-01".into()], vec!["XJ12".into()]],
        );
        let step = Step::parse_date(
            "date_payment_confirmed",
            DateChain::payment(),
            OnFailure::DropRow,
        );
        assert_eq!(step.apply(&mut data), 1);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_card_digits() {
        assert_eq!(
            card_digits(&"4111-1111-1111".into()),
            Some("411111111111".to_string())
        );
        assert_eq!(
            card_digits(&"???4971858637664481".into()),
            Some("4971858637664481".to_string())
        );
        assert_eq!(
            card_digits(&Value::Integer(30060773296197)),
            Some("30060773296197".to_string())
        );
        assert_eq!(card_digits(&"NB71VBAHJE".into()), None);
        assert_eq!(card_digits(&"4111A1111".into()), None);
        assert_eq!(card_digits(&"card_number".into()), None);
        assert_eq!(card_digits(&"".into()), None);
    }

    #[test]
    fn test_normalize_card_number_step() {
        let mut data = dataset(
            &["card_number"],
            vec![
                vec!["4111-1111-1111".into()],
                vec!["4111A1111".into()],
                vec!["??3400 0000 0000 009".into()],
            ],
        );
        assert_eq!(Step::normalize_card_number("card_number").apply(&mut data), 1);
        assert_eq!(data.get(0, "card_number"), Some(&Value::text("411111111111")));
        assert_eq!(data.get(1, "card_number"), Some(&Value::text("340000000000009")));
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("325".into()), Value::Integer(325));
        assert_eq!(leading_integer("30e".into()), Value::Integer(30));
        assert_eq!(leading_integer("J78".into()), Value::Null);
        assert_eq!(leading_integer(Value::Integer(7)), Value::Integer(7));
        assert_eq!(leading_integer(Value::Null), Value::Null);
    }

    #[test]
    fn test_dedupe_by_keeps_first() {
        let mut data = dataset(
            &["card_number", "card_provider"],
            vec![
                vec!["1".into(), "VISA".into()],
                vec!["1".into(), "Maestro".into()],
                vec!["2".into(), "VISA".into()],
            ],
        );
        assert_eq!(Step::dedupe_by("card_number").apply(&mut data), 1);
        assert_eq!(data.get(0, "card_provider"), Some(&Value::text("VISA")));
    }

    #[test]
    fn test_stringify_preserves_symbols() {
        let mut data = dataset(
            &["phone_number"],
            vec![
                vec!["+49(0)047905356".into()],
                vec![Value::Integer(7_911_123_456)],
                vec![Value::Null],
            ],
        );
        Step::stringify("phone_number").apply(&mut data);
        let column = data.column("phone_number").unwrap();
        assert_eq!(column[0], &Value::text("+49(0)047905356"));
        assert_eq!(column[1], &Value::text("7911123456"));
        assert_eq!(column[2], &Value::Null);
    }

    #[test]
    fn test_drop_empty_rows() {
        let mut data = dataset(
            &["a", "b"],
            vec![vec![Value::Null, Value::Null], vec![Value::Null, Value::Integer(1)]],
        );
        assert_eq!(Step::DropEmptyRows.apply(&mut data), 1);
        assert_eq!(data.len(), 1);
    }
}
