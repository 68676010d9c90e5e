//! Ordered rule pipelines and their reports

use super::step::Step;
use crate::dataset::Dataset;
use clap::ValueEnum;
use std::fmt;

/// The three datasets the centralizer knows how to clean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum EntityKind {
    User,
    Card,
    Store,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Card => write!(f, "card"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// Rows removed by one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: String,
    pub dropped: usize,
}

/// Advisory difference between the cleaned row count and the expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatch {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cleaned data has {} rows instead of {}",
            self.actual, self.expected
        )
    }
}

/// Drop-count summary of one cleaning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub entity: EntityKind,
    pub input_rows: usize,
    pub output_rows: usize,
    pub steps: Vec<StepReport>,
    pub count_mismatch: Option<CountMismatch>,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.input_rows - self.output_rows
    }
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} rows ({} dropped)",
            self.entity,
            self.input_rows,
            self.output_rows,
            self.dropped()
        )?;
        for step in self.steps.iter().filter(|s| s.dropped > 0) {
            write!(f, "\n  {:<48} -{}", step.step, step.dropped)?;
        }
        if let Some(mismatch) = &self.count_mismatch {
            write!(f, "\n  warning: {}", mismatch)?;
        }
        Ok(())
    }
}

/// A cleaned dataset together with its report
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub dataset: Dataset,
    pub report: CleanReport,
}

/// An ordered list of steps for one entity kind
#[derive(Debug, Clone)]
pub struct RulePipeline {
    entity: EntityKind,
    steps: Vec<Step>,
    expected_rows: Option<usize>,
}

impl RulePipeline {
    pub fn new(entity: EntityKind, steps: Vec<Step>) -> Self {
        Self {
            entity,
            steps,
            expected_rows: None,
        }
    }

    /// Warn when the cleaned row count differs from `expected`
    pub fn with_expected_rows(mut self, expected: Option<usize>) -> Self {
        self.expected_rows = expected;
        self
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn expected_rows(&self) -> Option<usize> {
        self.expected_rows
    }

    /// Run every step in order.
    ///
    /// A count mismatch is logged and recorded but never fails the run.
    pub fn clean(&self, mut data: Dataset) -> Cleaned {
        let input_rows = data.len();
        log::debug!("Cleaning {} {} row(s)", input_rows, self.entity);

        let steps = self
            .steps
            .iter()
            .map(|step| {
                let dropped = step.apply(&mut data);
                log::debug!("{} {}: dropped {}", self.entity, step.name(), dropped);
                StepReport {
                    step: step.name(),
                    dropped,
                }
            })
            .collect();

        let output_rows = data.len();
        let count_mismatch = match self.expected_rows {
            Some(expected) if expected != output_rows => {
                log::warn!(
                    "{} data has {} rows instead of {}",
                    self.entity,
                    output_rows,
                    expected
                );
                Some(CountMismatch {
                    expected,
                    actual: output_rows,
                })
            }
            Some(expected) => {
                log::info!("{} data cleaning retained the expected {} rows", self.entity, expected);
                None
            }
            None => None,
        };

        Cleaned {
            dataset: data,
            report: CleanReport {
                entity: self.entity,
                input_rows,
                output_rows,
                steps,
                count_mismatch,
            },
        }
    }
}
