//! Priority-ordered cascading over backend tiers.

use crate::{ExhaustionRegistry, RegistryStore, RoutingCursor};
use cascade_core::Clock;
use cascade_error::{
    CascadeResult, FailureClass, RouterError, RouterErrorKind, UpstreamError, UpstreamErrorKind,
};
use cascade_rate_limit::{BackendTier, RouterConfig, ThrottledQueue, Tier, validate_tiers};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Point-in-time view of one tier, for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct TierStatus {
    /// Tier identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Routing rank, lower is preferred
    pub priority: u32,
    /// Requests per minute budget
    pub rpm: u32,
    /// Spacing enforced between request starts
    pub min_interval: Duration,
    /// Whether the tier is in the exhaustion registry
    pub exhausted: bool,
    /// Whether a request submitted now would start immediately
    pub ready: bool,
}

/// Routes calls across backend tiers, cascading on rate limits and outages.
///
/// Each tier gets its own [`ThrottledQueue`]. The exhaustion registry and
/// its persistence sit behind one async lock, so a failure's registry update
/// and save happen as a single step.
#[derive(Debug)]
pub struct BackendRouter {
    tiers: Vec<BackendTier>,
    queues: Vec<ThrottledQueue>,
    registry: Mutex<ExhaustionRegistry>,
    cursor: StdMutex<RoutingCursor>,
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    config: RouterConfig,
    reset_offset: FixedOffset,
}

impl BackendRouter {
    /// Build a router and restore persisted exhaustion state.
    ///
    /// Tiers are validated and ordered by priority. A persisted registry
    /// from an earlier calendar day is discarded; one that cannot be read
    /// is logged and ignored. Ids no longer configured are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if `tiers` is empty or invalid, or a router setting
    /// fails [`RouterConfig::validate`].
    #[instrument(skip_all, fields(tier_count = tiers.len()))]
    pub async fn load(
        tiers: Vec<BackendTier>,
        store: Arc<dyn RegistryStore>,
        clock: Arc<dyn Clock>,
        config: RouterConfig,
    ) -> CascadeResult<Self> {
        if tiers.is_empty() {
            return Err(RouterError::new(RouterErrorKind::NoTiers).into());
        }
        let tiers = validate_tiers(tiers)?;
        config.validate()?;
        let reset_offset = config.reset_offset()?;

        let queues = tiers
            .iter()
            .map(|tier| ThrottledQueue::for_tier(tier, config.spacing_margin))
            .collect();

        let mut registry = match store.load().await {
            Ok(Some(snapshot)) => ExhaustionRegistry::restore(snapshot, clock.now(), reset_offset),
            Ok(None) => ExhaustionRegistry::new(),
            Err(e) => {
                warn!(error = %e, "Failed to load exhaustion state, starting fresh");
                ExhaustionRegistry::new()
            }
        };
        registry.retain(|id| tiers.iter().any(|tier| tier.id == id));

        let mut cursor = RoutingCursor::new();
        cursor.advance_past(&tiers, &registry);

        info!(
            exhausted = registry.len(),
            cursor = cursor.position(),
            "Backend router ready"
        );

        Ok(Self {
            tiers,
            queues,
            registry: Mutex::new(registry),
            cursor: StdMutex::new(cursor),
            store,
            clock,
            config,
            reset_offset,
        })
    }

    /// Tiers in priority order.
    pub fn tiers(&self) -> &[BackendTier] {
        &self.tiers
    }

    /// Routing configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Offset whose calendar day governs quota resets.
    pub fn reset_offset(&self) -> FixedOffset {
        self.reset_offset
    }

    /// Look up a tier by id.
    pub fn tier(&self, id: &str) -> Option<&BackendTier> {
        self.index_of(id).map(|index| &self.tiers[index])
    }

    /// Queue serving tier `id`.
    pub fn queue(&self, id: &str) -> Option<&ThrottledQueue> {
        self.index_of(id).map(|index| &self.queues[index])
    }

    /// Current rotation position.
    pub fn cursor_position(&self) -> usize {
        self.cursor_guard().position()
    }

    /// Ids currently in the exhaustion registry.
    pub async fn exhausted_tiers(&self) -> Vec<String> {
        self.registry.lock().await.ids().map(str::to_string).collect()
    }

    /// Time the registry last changed.
    pub async fn exhaustion_saved_at(&self) -> Option<DateTime<Utc>> {
        self.registry.lock().await.saved_at()
    }

    /// Status of every tier, in priority order.
    pub async fn tier_status(&self) -> Vec<TierStatus> {
        let registry = self.registry.lock().await;
        self.tiers
            .iter()
            .zip(&self.queues)
            .map(|(tier, queue)| TierStatus {
                id: tier.id.clone(),
                name: tier.name().to_string(),
                priority: tier.priority,
                rpm: tier.rpm,
                min_interval: queue.min_interval(),
                exhausted: registry.contains(&tier.id),
                ready: queue.is_ready(),
            })
            .collect()
    }

    /// Clear the exhaustion registry on demand.
    ///
    /// Returns how many tiers were cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleared registry cannot be persisted.
    #[instrument(skip(self))]
    pub async fn reset_exhaustion(&self) -> CascadeResult<usize> {
        let mut registry = self.registry.lock().await;
        let cleared = registry.len();
        let now = self.clock.now();
        registry.clear(now);
        self.cursor_guard().reset();
        self.store.save(&registry.snapshot(now)).await?;
        info!(cleared, "Exhaustion registry reset");
        Ok(cleared)
    }

    /// Run a call against the best available tier, cascading on failure.
    ///
    /// `factory` builds the upstream call for a given tier; it is invoked
    /// once per attempt, after the tier's queue grants the turn, and each
    /// call is bounded by the configured timeout.
    ///
    /// A known, non-exhausted `preferred_tier_id` is tried first. Rotation
    /// then walks tiers in priority order for at most twice the tier count,
    /// skipping exhausted tiers and tiers that were unavailable earlier in
    /// this call. When every tier is exhausted the registry is cleared and
    /// rotation restarts at the top.
    ///
    /// # Errors
    ///
    /// Returns the upstream error verbatim for failures that are neither
    /// rate limits nor outages, and `AllBackendsExhausted` when the attempt
    /// bound is reached.
    #[instrument(skip_all, fields(preferred = preferred_tier_id))]
    pub async fn execute<T, F, Fut>(
        &self,
        factory: F,
        preferred_tier_id: Option<&str>,
    ) -> CascadeResult<T>
    where
        F: Fn(BackendTier) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let tier_count = self.tiers.len();
        let mut attempts = 0;
        let mut passed = HashSet::new();

        if let Some(id) = preferred_tier_id {
            match self.index_of(id) {
                None => warn!(tier = id, "Unknown preferred tier, using rotation"),
                Some(index) => {
                    let exhausted = self.registry.lock().await.contains(id);
                    if exhausted {
                        debug!(tier = id, "Preferred tier exhausted, using rotation");
                    } else {
                        attempts += 1;
                        match self.attempt(index, &factory).await {
                            Ok(value) => return Ok(value),
                            Err(e) => self.absorb(index, e, &mut passed).await?,
                        }
                    }
                }
            }
        }

        let mut position = self.cursor_position();
        for _ in 0..2 * tier_count {
            let registry = self.registry.lock().await.clone();
            while position < tier_count && !self.is_eligible(position, &registry, &passed) {
                position += 1;
            }

            if position >= tier_count {
                if registry.is_empty() {
                    debug!("Rotation wrapped, retrying from the top");
                } else {
                    self.soft_reset(&passed).await;
                }
                passed.clear();
                position = 0;
                continue;
            }

            let index = self.overflow_target(position, &registry, &passed);
            attempts += 1;
            match self.attempt(index, &factory).await {
                Ok(value) => return Ok(value),
                Err(e) => self.absorb(index, e, &mut passed).await?,
            }
        }

        warn!(attempts, "Every backend tier failed");
        Err(RouterError::new(RouterErrorKind::AllBackendsExhausted { attempts }).into())
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.tiers.iter().position(|tier| tier.id == id)
    }

    fn cursor_guard(&self) -> MutexGuard<'_, RoutingCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_eligible(
        &self,
        index: usize,
        registry: &ExhaustionRegistry,
        passed: &HashSet<usize>,
    ) -> bool {
        !passed.contains(&index) && !registry.contains(&self.tiers[index].id)
    }

    fn later_eligible<'a>(
        &'a self,
        position: usize,
        registry: &'a ExhaustionRegistry,
        passed: &'a HashSet<usize>,
    ) -> impl Iterator<Item = usize> + 'a {
        (position + 1..self.tiers.len())
            .filter(move |&index| self.is_eligible(index, registry, passed))
    }

    /// Tier to submit to when `position` is selected.
    ///
    /// A busy selected tier yields to the first later eligible tier whose
    /// queue is idle. With none idle, the call goes to whichever of the
    /// selected and later eligible tiers can start soonest: fewest queued
    /// tasks first, then earliest next start, the selected tier winning ties.
    fn overflow_target(
        &self,
        position: usize,
        registry: &ExhaustionRegistry,
        passed: &HashSet<usize>,
    ) -> usize {
        if !self.config.overflow_to_idle_tiers || self.queues[position].is_ready() {
            return position;
        }

        let target = self
            .later_eligible(position, registry, passed)
            .find(|&index| self.queues[index].is_ready())
            .or_else(|| {
                std::iter::once(position)
                    .chain(self.later_eligible(position, registry, passed))
                    .min_by_key(|&index| {
                        let queue = &self.queues[index];
                        (queue.pending(), queue.next_start())
                    })
            })
            .unwrap_or(position);

        if target != position {
            debug!(
                busy = %self.tiers[position].id,
                tier = %self.tiers[target].id,
                "Overflowing to the tier that can start soonest"
            );
        }
        target
    }

    async fn attempt<T, F, Fut>(&self, index: usize, factory: &F) -> Result<T, UpstreamError>
    where
        F: Fn(BackendTier) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let tier = &self.tiers[index];
        let timeout = self.config.call_timeout();
        debug!(tier = %tier.id, "Submitting to tier queue");

        self.queues[index]
            .submit(async {
                match tokio::time::timeout(timeout, factory(tier.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(UpstreamError::new(UpstreamErrorKind::Timeout(
                        timeout.as_millis() as u64,
                    ))),
                }
            })
            .await
    }

    /// Apply a failed attempt to the routing state.
    ///
    /// Rate limits and outages are absorbed; anything else is returned.
    async fn absorb(
        &self,
        index: usize,
        error: UpstreamError,
        passed: &mut HashSet<usize>,
    ) -> CascadeResult<()> {
        let tier_id = &self.tiers[index].id;
        match error.failure_class() {
            FailureClass::RateLimited => {
                info!(tier = %tier_id, error = %error.kind, "Tier rate limited, marking exhausted");
                self.mark_exhausted(index).await;
                Ok(())
            }
            FailureClass::Unavailable => {
                warn!(tier = %tier_id, error = %error.kind, "Tier unavailable, cascading");
                passed.insert(index);
                Ok(())
            }
            FailureClass::Other => {
                debug!(tier = %tier_id, error = %error.kind, "Tier rejected the call");
                Err(error.into())
            }
        }
    }

    async fn mark_exhausted(&self, index: usize) {
        let mut registry = self.registry.lock().await;
        let now = self.clock.now();
        registry.mark(&self.tiers[index].id, now);
        self.cursor_guard().advance_past(&self.tiers, &registry);
        self.persist(&registry, now).await;
    }

    /// Clear the registry if no tier is eligible for this call.
    ///
    /// Checked under the registry lock so concurrent callers reset once.
    async fn soft_reset(&self, passed: &HashSet<usize>) {
        let mut registry = self.registry.lock().await;
        let saturated = !registry.is_empty()
            && (0..self.tiers.len()).all(|index| !self.is_eligible(index, &registry, passed));
        if !saturated {
            debug!("Soft reset already performed by another call");
            return;
        }

        warn!(cleared = registry.len(), "Every tier exhausted, performing soft reset");
        let now = self.clock.now();
        registry.clear(now);
        self.cursor_guard().reset();
        self.persist(&registry, now).await;
    }

    async fn persist(&self, registry: &ExhaustionRegistry, now: DateTime<Utc>) {
        if let Err(e) = self.store.save(&registry.snapshot(now)).await {
            warn!(error = %e, "Failed to persist exhaustion state");
        }
    }
}
