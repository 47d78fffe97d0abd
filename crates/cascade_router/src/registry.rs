//! Exhausted-tier bookkeeping and its day-boundary rules.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persisted form of the exhaustion registry.
///
/// ```json
/// { "exhausted_tier_ids": ["gemini-2.5-pro"], "saved_at": "2025-05-10T08:00:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Tiers whose quota was spent when the snapshot was taken
    pub exhausted_tier_ids: Vec<String>,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
}

/// Whether `a` and `b` fall on the same calendar day in `offset`.
///
/// # Examples
///
/// ```
/// use cascade_router::same_calendar_day;
/// use chrono::{FixedOffset, TimeZone, Utc};
///
/// let late = Utc.with_ymd_and_hms(2025, 5, 10, 23, 30, 0).unwrap();
/// let early = Utc.with_ymd_and_hms(2025, 5, 11, 0, 30, 0).unwrap();
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let pacific = FixedOffset::west_opt(7 * 3600).unwrap();
///
/// assert!(!same_calendar_day(late, early, utc));
/// assert!(same_calendar_day(late, early, pacific));
/// ```
pub fn same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>, offset: FixedOffset) -> bool {
    a.with_timezone(&offset).date_naive() == b.with_timezone(&offset).date_naive()
}

/// Set of tiers whose quota is spent, plus the time of the last change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExhaustionRegistry {
    exhausted: BTreeSet<String>,
    saved_at: Option<DateTime<Utc>>,
}

impl ExhaustionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a persisted snapshot.
    ///
    /// A snapshot taken on an earlier calendar day than `now` (in `offset`)
    /// is stale: the upstream has reset its quotas since, so the result is
    /// empty.
    pub fn restore(snapshot: RegistrySnapshot, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        if !same_calendar_day(snapshot.saved_at, now, offset) {
            tracing::info!(
                saved_at = %snapshot.saved_at,
                discarded = snapshot.exhausted_tier_ids.len(),
                "Discarding exhaustion state from a previous day"
            );
            return Self::new();
        }

        Self {
            exhausted: snapshot.exhausted_tier_ids.into_iter().collect(),
            saved_at: Some(snapshot.saved_at),
        }
    }

    /// Whether `tier_id` is exhausted.
    pub fn contains(&self, tier_id: &str) -> bool {
        self.exhausted.contains(tier_id)
    }

    /// Record `tier_id` as exhausted. Returns true if it was not already.
    pub fn mark(&mut self, tier_id: &str, now: DateTime<Utc>) -> bool {
        self.saved_at = Some(now);
        self.exhausted.insert(tier_id.to_string())
    }

    /// Forget every exhausted tier.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.exhausted.clear();
        self.saved_at = Some(now);
    }

    /// Keep only the tiers for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.exhausted.retain(|id| keep(id));
    }

    /// Number of exhausted tiers.
    pub fn len(&self) -> usize {
        self.exhausted.len()
    }

    /// Whether no tier is exhausted.
    pub fn is_empty(&self) -> bool {
        self.exhausted.is_empty()
    }

    /// Exhausted tier ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.exhausted.iter().map(String::as_str)
    }

    /// Time of the last change, if any.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    /// Persistable form, stamped with `now`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> RegistrySnapshot {
        RegistrySnapshot {
            exhausted_tier_ids: self.exhausted.iter().cloned().collect(),
            saved_at: self.saved_at.unwrap_or(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn snapshot(saved_at: DateTime<Utc>) -> RegistrySnapshot {
        RegistrySnapshot {
            exhausted_tier_ids: vec!["a".to_string(), "b".to_string()],
            saved_at,
        }
    }

    #[test]
    fn same_day_snapshot_is_restored() {
        let saved = Utc.with_ymd_and_hms(2025, 5, 10, 1, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 23, 59, 59).unwrap();
        let registry = ExhaustionRegistry::restore(snapshot(saved), now, utc());
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.saved_at(), Some(saved));
    }

    #[test]
    fn prior_day_snapshot_is_discarded() {
        let saved = Utc.with_ymd_and_hms(2025, 5, 10, 23, 59, 59).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 11, 0, 0, 0).unwrap();
        let registry = ExhaustionRegistry::restore(snapshot(saved), now, utc());
        assert!(registry.is_empty());
    }

    #[test]
    fn day_boundary_follows_offset() {
        // 06:00 UTC is still the previous day at UTC-8.
        let saved = Utc.with_ymd_and_hms(2025, 5, 10, 20, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 11, 6, 0, 0).unwrap();
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        assert!(!ExhaustionRegistry::restore(snapshot(saved), now, pacific).is_empty());
        assert!(ExhaustionRegistry::restore(snapshot(saved), now, utc()).is_empty());
    }

    #[test]
    fn mark_is_idempotent() {
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap();
        let mut registry = ExhaustionRegistry::new();
        assert!(registry.mark("a", now));
        assert!(!registry.mark("a", now));
        assert_eq!(registry.snapshot(now).exhausted_tier_ids, vec!["a".to_string()]);
    }

    #[test]
    fn snapshot_serializes_rfc3339() {
        let saved = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let json = serde_json::to_value(snapshot(saved)).unwrap();
        assert_eq!(json["saved_at"], "2025-05-10T08:00:00Z");
        assert_eq!(json["exhausted_tier_ids"][1], "b");
    }
}
