//! Configuration structures for tiers, routing, caching and storage.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from cascade.toml)
//! - User overrides (~/.config/cascade/cascade.toml, then ./cascade.toml)
//! - Environment overrides (`CASCADE__ROUTER__CALL_TIMEOUT_SECS=10`)

use crate::{DEFAULT_SPACING_MARGIN, Tier};
use cascade_error::{CascadeError, CascadeResult, ConfigError};
use chrono::FixedOffset;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Largest accepted spacing margin.
const MAX_SPACING_MARGIN: f64 = 100.0;

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../cascade.toml");

/// Static description of one backend tier.
///
/// # Example
///
/// ```toml
/// [[tiers]]
/// id = "gemini-2.5-flash-lite"
/// name = "Flash Lite"
/// rpm = 15
/// priority = 0
/// cost_per_million_input_tokens = 0.10
/// cost_per_million_output_tokens = 0.40
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct BackendTier {
    /// Identifier sent to the upstream
    #[setters(skip)]
    pub id: String,

    /// Display name (defaults to the id)
    #[serde(default)]
    pub name: String,

    /// Requests per minute budget
    #[setters(skip)]
    pub rpm: u32,

    /// Routing rank, lower is preferred
    #[setters(skip)]
    pub priority: u32,

    /// Cost per million input tokens in USD
    #[serde(default)]
    pub cost_per_million_input_tokens: f64,

    /// Cost per million output tokens in USD
    #[serde(default)]
    pub cost_per_million_output_tokens: f64,
}

impl BackendTier {
    /// Create a free tier with the given budget and rank.
    pub fn new(id: impl Into<String>, rpm: u32, priority: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            rpm,
            priority,
            cost_per_million_input_tokens: 0.0,
            cost_per_million_output_tokens: 0.0,
        }
    }
}

impl Tier for BackendTier {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    fn rpm(&self) -> u32 {
        self.rpm
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn cost_per_million_input_tokens(&self) -> f64 {
        self.cost_per_million_input_tokens
    }

    fn cost_per_million_output_tokens(&self) -> f64 {
        self.cost_per_million_output_tokens
    }
}

/// Validate a tier list and order it by priority.
///
/// Ties keep their declaration order.
///
/// # Errors
///
/// Returns an error if the list is empty, an id is empty or repeated, or a
/// tier has a zero RPM budget.
pub fn validate_tiers(tiers: Vec<BackendTier>) -> CascadeResult<Vec<BackendTier>> {
    if tiers.is_empty() {
        return Err(ConfigError::new("at least one [[tiers]] entry is required").into());
    }

    let mut seen = HashSet::new();
    for tier in &tiers {
        if tier.id.trim().is_empty() {
            return Err(ConfigError::new("tier id must not be empty").into());
        }
        if tier.rpm == 0 {
            return Err(ConfigError::new(format!("tier '{}' has rpm = 0", tier.id)).into());
        }
        if !seen.insert(tier.id.as_str()) {
            return Err(ConfigError::new(format!("duplicate tier id '{}'", tier.id)).into());
        }
    }

    let mut ordered = tiers;
    ordered.sort_by_key(|tier| tier.priority);
    Ok(ordered)
}

/// Routing behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Upper bound on one upstream call, in seconds
    pub call_timeout_secs: u64,

    /// Safety margin on top of the exact RPM spacing
    pub spacing_margin: f64,

    /// UTC offset, in minutes, of the calendar day the upstream resets quotas on
    pub reset_utc_offset_minutes: i32,

    /// Send rotation traffic to an idle lower-priority tier instead of waiting
    /// on a busy higher-priority one
    pub overflow_to_idle_tiers: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            spacing_margin: DEFAULT_SPACING_MARGIN,
            reset_utc_offset_minutes: 0,
            overflow_to_idle_tiers: true,
        }
    }
}

impl RouterConfig {
    /// Upper bound on one upstream call.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Check the settings a router cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error if the call timeout is zero, the spacing margin is
    /// not in `(0, 100]`, or the reset offset is out of range.
    pub fn validate(&self) -> CascadeResult<()> {
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::new("call_timeout_secs must be at least 1").into());
        }
        let margin = self.spacing_margin;
        if !(margin.is_finite() && margin > 0.0 && margin <= MAX_SPACING_MARGIN) {
            return Err(ConfigError::new(format!(
                "spacing_margin must be in (0, {}], got {}",
                MAX_SPACING_MARGIN, margin
            ))
            .into());
        }
        self.reset_offset()?;
        Ok(())
    }

    /// Offset whose calendar day decides when exhausted tiers reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is outside ±24h.
    pub fn reset_offset(&self) -> CascadeResult<FixedOffset> {
        FixedOffset::east_opt(self.reset_utc_offset_minutes * 60).ok_or_else(|| {
            CascadeError::from(ConfigError::new(format!(
                "reset_utc_offset_minutes out of range: {}",
                self.reset_utc_offset_minutes
            )))
        })
    }
}

/// Response cache behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether responses are cached at all
    pub enabled: bool,

    /// Entry lifetime in seconds
    pub ttl_secs: u64,

    /// Byte quota for stored entries (`None` for unlimited)
    pub max_bytes: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 24 * 60 * 60,
            max_bytes: Some(5 * 1024 * 1024),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX))
    }
}

/// Where persisted state lives.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// State directory; defaults to the platform data directory
    pub state_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved state directory.
    pub fn resolve_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("cascade"))
                .unwrap_or_else(|| PathBuf::from(".cascade"))
        })
    }

    /// File holding the exhaustion registry.
    pub fn registry_path(&self) -> PathBuf {
        self.resolve_state_dir().join("exhaustion.json")
    }

    /// Directory holding cached responses.
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_state_dir().join("cache")
    }
}

/// Upstream endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the generation API
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// Top-level Cascade configuration.
///
/// # Example
///
/// ```no_run
/// use cascade_rate_limit::CascadeConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CascadeConfig::load()?;
/// for tier in &config.tiers {
///     println!("{} ({} rpm)", tier.id, tier.rpm);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CascadeConfig {
    /// Routing behaviour
    #[serde(default)]
    pub router: RouterConfig,

    /// Response cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,

    /// Persisted state location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upstream endpoint
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Backend tiers, in any order
    #[serde(default)]
    pub tiers: Vec<BackendTier>,
}

impl CascadeConfig {
    /// Load the bundled defaults overlaid with a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the tier
    /// list is invalid.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> CascadeResult<Self> {
        debug!("Loading configuration from file");

        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));

        Self::finish(builder)
    }

    /// Parse configuration from a TOML string, without bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not parse or the tier list is invalid.
    pub fn from_toml_str(toml: &str) -> CascadeResult<Self> {
        Self::finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled default.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> CascadeResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/cascade/cascade.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("cascade").required(false))
            .add_source(Environment::with_prefix("CASCADE").separator("__"));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> CascadeResult<Self> {
        let mut config: CascadeConfig = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.tiers = validate_tiers(config.tiers)?;
        config.router.validate()?;

        debug!(tiers = config.tiers.len(), "Configuration loaded");
        Ok(config)
    }

    /// Look up a tier by id.
    pub fn tier(&self, id: &str) -> Option<&BackendTier> {
        self.tiers.iter().find(|tier| tier.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_parse() {
        let config = CascadeConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert!(!config.tiers.is_empty());
        assert!(config.tiers.windows(2).all(|w| w[0].priority <= w[1].priority));
        assert_eq!(config.cache.ttl_secs, 86_400);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let tiers = vec![BackendTier::new("a", 10, 0), BackendTier::new("a", 5, 1)];
        assert!(validate_tiers(tiers).is_err());
    }

    #[test]
    fn zero_rpm_is_rejected() {
        assert!(validate_tiers(vec![BackendTier::new("a", 0, 0)]).is_err());
    }

    #[test]
    fn tiers_sort_by_priority_keeping_ties_in_order() {
        let tiers = vec![
            BackendTier::new("slow", 5, 2),
            BackendTier::new("first", 10, 0),
            BackendTier::new("second", 10, 0),
        ];
        let ordered = validate_tiers(tiers).unwrap();
        let ids: Vec<_> = ordered.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "slow"]);
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let router = RouterConfig {
            reset_utc_offset_minutes: 25 * 60,
            ..RouterConfig::default()
        };
        assert!(router.reset_offset().is_err());
    }

    #[test]
    fn zero_call_timeout_is_rejected() {
        let router = RouterConfig {
            call_timeout_secs: 0,
            ..RouterConfig::default()
        };
        assert!(router.validate().is_err());
    }

    #[test]
    fn spacing_margin_must_be_positive_and_bounded() {
        for margin in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e12] {
            let router = RouterConfig {
                spacing_margin: margin,
                ..RouterConfig::default()
            };
            assert!(router.validate().is_err(), "margin {} accepted", margin);
        }
        assert!(RouterConfig::default().validate().is_ok());
    }
}
