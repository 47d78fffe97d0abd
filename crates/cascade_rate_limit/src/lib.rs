//! Backend tiers and per-tier request spacing.
//!
//! This crate describes the interchangeable backend tiers of the generation
//! service and enforces each tier's requests-per-minute budget on the client
//! side:
//!
//! - [`Tier`] / [`BackendTier`] - static tier description (budget, priority, prices)
//! - [`ThrottledQueue`] - serial FIFO queue that spaces task starts by the
//!   tier's minimum interval, paced by a `governor` quota
//! - [`TokioClock`] - governor clock on tokio time, so paused runtimes drive pacing
//! - [`CascadeConfig`] - layered TOML configuration for tiers, router, cache,
//!   storage and upstream

mod clock;
mod config;
mod queue;
mod tier;

pub use clock::{TokioClock, TokioInstant};
pub use config::{
    BackendTier, CacheConfig, CascadeConfig, RouterConfig, StorageConfig, UpstreamConfig,
    validate_tiers,
};
pub use queue::ThrottledQueue;
pub use tier::{DEFAULT_SPACING_MARGIN, Tier};
