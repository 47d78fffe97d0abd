//! Caller-facing request entry point.

use crate::{
    FanoutUsageSink, GeminiUpstream, MetricsUsageSink, TracingUsageSink, UpstreamClient,
    UsageSink,
};
use cascade_cache::{CacheKey, FileCacheStore, ResponseCache};
use cascade_core::{
    Clock, RequestOptions, SystemClock, UsageOutcome, UsageRecord, estimate_cost, estimate_tokens,
};
use cascade_error::{CascadeResult, UpstreamError};
use cascade_extract::extract;
use cascade_rate_limit::{BackendTier, CascadeConfig, Tier};
use cascade_router::{BackendRouter, JsonFileRegistryStore};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Build a router from configuration, with exhaustion state kept in the
/// configured state directory.
///
/// # Errors
///
/// Returns an error if the tier list or router settings are invalid.
pub async fn load_router(
    config: &CascadeConfig,
    clock: Arc<dyn Clock>,
) -> CascadeResult<BackendRouter> {
    let store = Arc::new(JsonFileRegistryStore::new(config.storage.registry_path()));
    BackendRouter::load(config.tiers.clone(), store, clock, config.router.clone()).await
}

/// Single entry point for generation requests.
///
/// Checks the response cache, routes misses through the [`BackendRouter`],
/// reports every attempt to the usage sink and caches successful text.
///
/// # Example
///
/// ```no_run
/// use cascade::{CascadeConfig, RequestFacade, RequestOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CascadeConfig::load()?;
/// let facade = RequestFacade::from_config(&config).await?;
///
/// let options = RequestOptions::default().with_feature_label(Some("summary".to_string()));
/// let text = facade.request("Summarize the Rust book in one line", None, &options).await?;
/// println!("{}", text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestFacade {
    router: Arc<BackendRouter>,
    upstream: Arc<dyn UpstreamClient>,
    cache: ResponseCache,
    sink: Arc<dyn UsageSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFacade")
            .field("router", &self.router)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl RequestFacade {
    /// Assemble a facade from its parts.
    pub fn new(
        router: Arc<BackendRouter>,
        upstream: Arc<dyn UpstreamClient>,
        cache: ResponseCache,
        sink: Arc<dyn UsageSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            router,
            upstream,
            cache,
            sink,
            clock,
        }
    }

    /// Build the production stack: Gemini upstream, file-backed cache and
    /// exhaustion state, tracing and metrics sinks.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the configuration is
    /// invalid.
    #[instrument(skip_all)]
    pub async fn from_config(config: &CascadeConfig) -> CascadeResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let upstream = Arc::new(GeminiUpstream::from_config(&config.upstream)?);
        let router = Arc::new(load_router(config, clock.clone()).await?);

        let cache = if config.cache.enabled {
            let store = FileCacheStore::new(config.storage.cache_dir(), config.cache.max_bytes);
            ResponseCache::new(Arc::new(store), clock.clone(), config.cache.ttl())
        } else {
            ResponseCache::disabled(clock.clone())
        };

        let sink = FanoutUsageSink::new(vec![
            Arc::new(TracingUsageSink),
            Arc::new(MetricsUsageSink),
        ]);

        debug!(
            tiers = router.tiers().len(),
            cache_enabled = cache.is_enabled(),
            "Request facade ready"
        );
        Ok(Self::new(router, upstream, cache, Arc::new(sink), clock))
    }

    /// The router requests go through.
    pub fn router(&self) -> &BackendRouter {
        &self.router
    }

    /// The response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Generate text for `content`.
    ///
    /// A fresh cached response is returned without touching any tier.
    /// `preferred_tier_id` is a routing hint and is part of the cache key.
    ///
    /// # Errors
    ///
    /// Returns `AllBackendsExhausted` when no tier could serve the request
    /// (present it as "temporarily saturated, retry later"), or the upstream
    /// error for failures that are neither rate limits nor outages.
    #[instrument(
        skip(self, content, options),
        fields(feature = options.feature(), content_length = content.len())
    )]
    pub async fn request(
        &self,
        content: &str,
        preferred_tier_id: Option<&str>,
        options: &RequestOptions,
    ) -> CascadeResult<String> {
        let key = CacheKey::derive(preferred_tier_id, content);
        let feature = options.feature();
        let skip_cache = *options.skip_cache();

        if !skip_cache {
            if let Some(text) = self.cache.get(&key).await {
                self.emit(UsageRecord::cache_hit(feature, self.clock.now())).await;
                return Ok(text);
            }
        }

        let input_tokens = estimate_tokens(content);
        let result = self
            .router
            .execute(
                |tier| self.attempt(tier, content, feature, input_tokens),
                preferred_tier_id,
            )
            .await;

        match result {
            Ok(text) => {
                if !skip_cache {
                    self.cache.put(&key, &text).await;
                }
                Ok(text)
            }
            Err(e) => {
                let record = UsageRecord::new(feature, UsageOutcome::Failure, self.clock.now())
                    .with_input_tokens(input_tokens)
                    .with_error(Some(e.to_string()));
                self.emit(record).await;
                Err(e)
            }
        }
    }

    /// Generate text and extract the first JSON value from it.
    ///
    /// Returns `Ok(None)` when the response carries no parseable JSON.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request).
    pub async fn request_json(
        &self,
        content: &str,
        preferred_tier_id: Option<&str>,
        options: &RequestOptions,
    ) -> CascadeResult<Option<Value>> {
        let text = self.request(content, preferred_tier_id, options).await?;
        let value = extract(&text);
        if value.is_none() {
            debug!(response_length = text.len(), "No JSON found in response");
        }
        Ok(value)
    }

    /// One upstream call on `tier`, reported to the usage sink.
    async fn attempt(
        &self,
        tier: BackendTier,
        content: &str,
        feature: &str,
        input_tokens: u64,
    ) -> Result<String, UpstreamError> {
        let started = Instant::now();
        let result = self.upstream.call(&tier, content).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let record = UsageRecord::new(feature, UsageOutcome::Success, self.clock.now())
            .with_tier_id(Some(tier.id.clone()))
            .with_input_tokens(input_tokens)
            .with_latency_ms(latency_ms);

        let record = match &result {
            Ok(response) => {
                let output_tokens = estimate_tokens(&response.text);
                record
                    .with_output_tokens(output_tokens)
                    .with_estimated_cost_usd(estimate_cost(
                        input_tokens,
                        output_tokens,
                        tier.cost_per_million_input_tokens(),
                        tier.cost_per_million_output_tokens(),
                    ))
            }
            Err(e) => record
                .with_outcome(UsageOutcome::Failure)
                .with_error(Some(e.kind.to_string())),
        };
        self.emit(record).await;

        result.map(|response| response.text)
    }

    async fn emit(&self, record: UsageRecord) {
        if let Err(e) = self.sink.record(&record).await {
            warn!(error = %e, "Usage sink failed, record dropped");
        }
    }
}
