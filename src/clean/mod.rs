//! Dataset cleaning rules
//!
//! Each entity kind is cleaned by a [`RulePipeline`]: an ordered list of
//! [`Step`]s that normalize, validate and deduplicate rows. Row-level
//! problems never fail a run; offending rows are dropped and counted in the
//! [`CleanReport`].

mod card;
mod dates;
mod rules;
mod step;
mod store;
mod user;

pub use card::{CARD_REQUIRED, CardCleaner};
pub use dates::{DateChain, DateFormat};
pub use rules::{CleanReport, Cleaned, CountMismatch, EntityKind, RulePipeline, StepReport};
pub use step::{OnFailure, Step};
pub use store::{REDUNDANT_LATITUDE, STORE_CODE_PATTERN, StoreCleaner};
pub use user::{USER_REQUIRED, UserCleaner};
