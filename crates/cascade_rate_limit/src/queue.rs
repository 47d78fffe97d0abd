//! Serial FIFO queue enforcing a minimum spacing between task starts.
//!
//! Spacing is a GCRA quota with a burst of one: one cell per
//! `min_interval`, so consecutive starts are at least that far apart.
//! Ordering comes from [`tokio::sync::Mutex`], which grants the lock to
//! waiters in FIFO order.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{Tier, TokioClock, TokioInstant};

type SpacingLimiter = RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<TokioInstant>>;

/// Decrements the pending count when a submission completes or is dropped.
struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-tier queue that runs tasks one at a time, in submission order.
///
/// A task never starts earlier than `min_interval` after the previous task
/// started. Tasks are never rejected; back-pressure is applied by delaying
/// the start.
///
/// # Example
///
/// ```
/// use cascade_rate_limit::ThrottledQueue;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = ThrottledQueue::new("gemini-2.5-flash", Duration::from_millis(10));
/// let answer = queue.submit(async { 42 }).await;
/// assert_eq!(answer, 42);
/// # }
/// ```
pub struct ThrottledQueue {
    tier_id: String,
    min_interval: Duration,
    turn: Mutex<()>,
    limiter: Option<SpacingLimiter>,
    clock: TokioClock,
    last_start: StdMutex<Option<Instant>>,
    pending: AtomicUsize,
    dispatched: AtomicU64,
}

impl std::fmt::Debug for ThrottledQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledQueue")
            .field("tier_id", &self.tier_id)
            .field("min_interval", &self.min_interval)
            .field("pending", &self.pending())
            .field("dispatched", &self.dispatched())
            .finish_non_exhaustive()
    }
}

impl ThrottledQueue {
    /// Create a queue with an explicit minimum interval.
    ///
    /// A zero interval only serializes tasks.
    pub fn new(tier_id: impl Into<String>, min_interval: Duration) -> Self {
        let clock = TokioClock;
        let limiter = Quota::with_period(min_interval).map(|quota| {
            RateLimiter::direct_with_clock(quota.allow_burst(NonZeroU32::MIN), clock)
        });

        Self {
            tier_id: tier_id.into(),
            min_interval,
            turn: Mutex::new(()),
            limiter,
            clock,
            last_start: StdMutex::new(None),
            pending: AtomicUsize::new(0),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Create a queue spaced for `tier`'s RPM budget with the given margin.
    pub fn for_tier(tier: &impl Tier, margin: f64) -> Self {
        let queue = Self::new(tier.id(), tier.min_interval(margin));
        debug!(
            tier = tier.id(),
            rpm = tier.rpm(),
            min_interval_ms = queue.min_interval.as_millis() as u64,
            "Created throttled queue"
        );
        queue
    }

    /// Tier this queue serves.
    pub fn tier_id(&self) -> &str {
        &self.tier_id
    }

    /// Minimum spacing between task starts.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of tasks started so far, including one still running.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Tasks submitted but not yet finished (running or waiting).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Earliest instant the interval allows another start.
    ///
    /// Ignores tasks that are running or waiting; see [`pending`](Self::pending).
    pub fn next_start(&self) -> Instant {
        let now = Instant::now();
        match *self.last_start.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(last) => (last + self.min_interval).max(now),
            None => now,
        }
    }

    /// Whether a task submitted now would start immediately.
    ///
    /// True when nothing is running or waiting and the interval since the
    /// previous start has elapsed. Never blocks.
    pub fn is_ready(&self) -> bool {
        self.pending() == 0 && self.next_start() <= Instant::now()
    }

    /// Run `task` once its turn comes and the interval has elapsed.
    ///
    /// The queue stays occupied until the task completes, so a failing task
    /// releases the queue like any other and does not affect later tasks.
    pub async fn submit<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _pending = PendingGuard(&self.pending);

        let _turn = self.turn.lock().await;
        self.wait_for_slot().await;

        *self.last_start.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        let dispatched = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(tier = %self.tier_id, dispatched, "Dispatching task");

        task.await
    }

    async fn wait_for_slot(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            trace!(
                tier = %self.tier_id,
                wait_ms = wait.as_millis() as u64,
                "Waiting out tier interval"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
