//! Cascade - rate-limit-aware routing for tiered generation APIs
//!
//! Cascade sits between an application and a generation service that is
//! reachable through several interchangeable tiers (for example the models
//! of a free-tier API), each with its own requests-per-minute budget and a
//! daily quota.
//!
//! # Features
//!
//! - **Client-side spacing**: each tier has a serial queue that spaces
//!   request starts by its RPM budget
//! - **Cascading**: rate-limited tiers are remembered as exhausted for the
//!   rest of the calendar day, unavailable tiers are skipped for one call
//! - **Soft reset**: when every tier is exhausted, rotation starts over
//! - **Response cache**: identical requests within the TTL are served
//!   without an upstream call
//! - **Structured extraction**: pull JSON out of prose or markdown fences
//! - **Usage records**: per-attempt tokens, cost and latency to tracing and
//!   OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cascade::{CascadeConfig, RequestFacade, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CascadeConfig::load()?;
//!     let facade = RequestFacade::from_config(&config).await?;
//!
//!     let tags = facade
//!         .request_json("Return three tags for this post as a JSON array: ...", None, &RequestOptions::default())
//!         .await?;
//!     println!("{:?}", tags);
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `observability` - OpenTelemetry tracing and metrics exporters
//!
//! # Architecture
//!
//! - `cascade_error` - Error types
//! - `cascade_core` - Request options, usage records, clock, estimates
//! - `cascade_rate_limit` - Tiers, throttled queues, configuration
//! - `cascade_cache` - Response cache and stores
//! - `cascade_extract` - JSON extraction
//! - `cascade_router` - Tier routing and exhaustion state
//!
//! This crate (`cascade`) re-exports everything for convenience.

mod facade;
mod gemini;
mod metrics;
mod sink;
mod upstream;

pub use facade::{RequestFacade, load_router};
pub use gemini::GeminiUpstream;
pub use metrics::{CascadeMetrics, MetricsUsageSink};
pub use sink::{FanoutUsageSink, TracingUsageSink, UsageSink};
pub use upstream::{UpstreamClient, UpstreamResponse};

// Re-export workspace crates
pub use cascade_cache::*;
pub use cascade_core::*;
pub use cascade_error::*;
pub use cascade_extract::*;
pub use cascade_rate_limit::*;
pub use cascade_router::*;

// OpenTelemetry observability module
#[cfg(feature = "observability")]
pub mod observability;
