//! Governor clock backed by tokio time.

use governor::clock::{Clock, Reference};
use governor::nanos::Nanos;
use std::ops::Add;
use std::time::Duration;
use tokio::time::Instant;

/// A point on the tokio clock, usable as a governor reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokioInstant(Instant);

impl TokioInstant {
    /// The underlying tokio instant.
    pub fn into_inner(self) -> Instant {
        self.0
    }
}

impl Add<Nanos> for TokioInstant {
    type Output = TokioInstant;

    fn add(self, other: Nanos) -> TokioInstant {
        TokioInstant(self.0 + Duration::from(other))
    }
}

impl Reference for TokioInstant {
    fn duration_since(&self, earlier: Self) -> Nanos {
        Nanos::from(self.0.saturating_duration_since(earlier.0))
    }

    fn saturating_sub(&self, duration: Nanos) -> Self {
        self.0
            .checked_sub(Duration::from(duration))
            .map(TokioInstant)
            .unwrap_or(*self)
    }
}

/// Clock reading [`tokio::time::Instant`], so a paused runtime controls
/// rate limiting the same way it controls sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Instant = TokioInstant;

    fn now(&self) -> Self::Instant {
        TokioInstant(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_time() {
        let clock = TokioClock;
        let before = clock.now();
        tokio::time::advance(Duration::from_millis(250)).await;
        let after = clock.now();
        assert_eq!(
            Duration::from(after.duration_since(before)),
            Duration::from_millis(250)
        );
        assert_eq!(after.saturating_sub(Nanos::from(Duration::from_millis(250))), before);
    }
}
