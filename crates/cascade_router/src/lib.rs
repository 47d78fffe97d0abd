//! Tier routing for generation requests.
//!
//! [`BackendRouter`] spreads calls across a priority-ordered list of
//! backend tiers. Each tier has its own [`ThrottledQueue`](cascade_rate_limit::ThrottledQueue);
//! failures are classified at the call boundary:
//!
//! - **RateLimited**: the tier is recorded in the [`ExhaustionRegistry`],
//!   persisted through a [`RegistryStore`], and the call cascades
//! - **Unavailable**: the call cascades, the tier stays selectable
//! - **Other**: surfaced to the caller immediately
//!
//! When every tier is exhausted the registry is cleared ("soft reset") and
//! rotation starts again from the highest-priority tier. A registry saved on
//! an earlier calendar day is discarded on load.

mod cursor;
mod registry;
mod router;
mod store;

pub use cursor::RoutingCursor;
pub use registry::{ExhaustionRegistry, RegistrySnapshot, same_calendar_day};
pub use router::{BackendRouter, TierStatus};
pub use store::{JsonFileRegistryStore, MemoryRegistryStore, RegistryStore};
