//! Multi-format date parsing
//!
//! A [`DateChain`] is an ordered list of chrono format strings. Parsing tries
//! each format in turn and stops at the first one that produces a date, so
//! the order of a chain decides how ambiguous inputs such as `05/01/2021`
//! are read.
//!
//! Precedence of the built-in chains:
//!
//! | chain       | order                                                          |
//! |-------------|----------------------------------------------------------------|
//! | `mixed`     | year-first, month-first (US), day-first, month names, date-times |
//! | `day_first` | day-first numeric, day-first month names                       |
//! | `payment`   | day-first, year-first, month-first, month names, date-times    |
//!
//! Parsed years must have four digits. This stops `%Y` from accepting the
//! two-digit prefix of a string meant for a different layout.

use crate::dataset::Value;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// A single parse attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// Date-only chrono format
    Date(&'static str),
    /// Date-time chrono format; the time part is discarded
    DateTime(&'static str),
}

impl DateFormat {
    fn parse(&self, raw: &str) -> Option<NaiveDate> {
        match self {
            Self::Date(fmt) => NaiveDate::parse_from_str(raw, fmt).ok(),
            Self::DateTime(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                .ok()
                .map(|dt| dt.date()),
        }
    }
}

use DateFormat::{Date, DateTime};

const DATE_TIMES: [DateFormat; 4] = [
    DateTime("%Y-%m-%d %H:%M:%S"),
    DateTime("%Y-%m-%d %H:%M:%S%.f"),
    DateTime("%Y-%m-%dT%H:%M:%S"),
    DateTime("%Y-%m-%dT%H:%M:%S%.f"),
];

const MIXED: &[DateFormat] = &[
    Date("%Y-%m-%d"),
    Date("%Y/%m/%d"),
    Date("%Y.%m.%d"),
    Date("%Y %m %d"),
    Date("%Y%m%d"),
    Date("%m/%d/%Y"),
    Date("%m-%d-%Y"),
    Date("%m.%d.%Y"),
    Date("%d/%m/%Y"),
    Date("%d-%m-%Y"),
    Date("%d.%m.%Y"),
    Date("%B %Y %d"),
    Date("%Y %B %d"),
    Date("%B %d %Y"),
    Date("%B %d, %Y"),
    Date("%d %B %Y"),
    Date("%d-%b-%Y"),
    Date("%Y-%b-%d"),
    DATE_TIMES[0],
    DATE_TIMES[1],
    DATE_TIMES[2],
    DATE_TIMES[3],
];

const DAY_FIRST: &[DateFormat] = &[
    Date("%d/%m/%Y"),
    Date("%d-%m-%Y"),
    Date("%d.%m.%Y"),
    Date("%d %m %Y"),
    Date("%d%m%Y"),
    Date("%d %B %Y"),
    Date("%d-%b-%Y"),
    Date("%d %B, %Y"),
];

const PAYMENT: &[DateFormat] = &[
    // day-month-year
    Date("%d-%m-%Y"),
    Date("%d/%m/%Y"),
    Date("%d.%m.%Y"),
    Date("%d %m %Y"),
    Date("%d%m%Y"),
    // year-month-day
    Date("%Y-%m-%d"),
    Date("%Y/%m/%d"),
    Date("%Y.%m.%d"),
    Date("%Y %m %d"),
    Date("%Y%m%d"),
    // month/day/year
    Date("%m-%d-%Y"),
    Date("%m/%d/%Y"),
    Date("%m.%d.%Y"),
    Date("%m %d %Y"),
    Date("%m%d%Y"),
    // month names
    Date("%B %Y %d"),
    Date("%Y %B %d"),
    Date("%d %B %Y"),
    Date("%B %d %Y"),
    Date("%B %d, %Y"),
    Date("%d-%b-%Y"),
    Date("%Y-%b-%d"),
    DATE_TIMES[0],
    DATE_TIMES[1],
    DATE_TIMES[2],
    DATE_TIMES[3],
];

/// An ordered fallback chain of date formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateChain {
    name: &'static str,
    formats: &'static [DateFormat],
}

impl DateChain {
    /// Year-first, then US month-first, then day-first, then month-name layouts.
    ///
    /// Month-first wins for ambiguous numeric input, so `05/01/2021` is
    /// 1 May while `25/12/1990` falls through to day-first.
    pub const fn mixed() -> Self {
        Self {
            name: "mixed",
            formats: MIXED,
        }
    }

    /// Day-first layouts used to correct values `mixed` rejected
    pub const fn day_first() -> Self {
        Self {
            name: "day-first",
            formats: DAY_FIRST,
        }
    }

    /// Layouts seen in card payment and store opening dates
    pub const fn payment() -> Self {
        Self {
            name: "payment",
            formats: PAYMENT,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn formats(&self) -> &'static [DateFormat] {
        self.formats
    }

    /// Parse a raw string, returning the first successful interpretation
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.formats
            .iter()
            .filter_map(|f| f.parse(raw))
            .find(|d| (1000..=9999).contains(&d.year()))
    }

    /// Parse a cell.
    ///
    /// Dates pass through untouched so re-cleaning is a no-op. Integers are
    /// read as their decimal text (e.g. `20210501`).
    pub fn parse_value(&self, value: &Value) -> Option<NaiveDate> {
        match value {
            Value::Date(d) => Some(*d),
            Value::Text(s) => self.parse(s),
            Value::Integer(i) => self.parse(&i.to_string()),
            Value::Null | Value::Real(_) => None,
        }
    }
}
