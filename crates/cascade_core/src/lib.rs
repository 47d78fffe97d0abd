//! Core data types for the Cascade generation-request router.
//!
//! This crate provides the value types shared by the cache, the router and the
//! request facade: caller options, usage records for observability, token and
//! cost estimation, and the [`Clock`] port used wherever wall-clock time
//! matters (cache TTLs, calendar-day quota resets).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod estimate;
mod request;
mod usage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use estimate::{estimate_cost, estimate_tokens};
pub use request::RequestOptions;
pub use usage::{UsageOutcome, UsageRecord};
