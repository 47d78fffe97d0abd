//! Rotation position over the priority-ordered tier list.

use crate::ExhaustionRegistry;
use cascade_rate_limit::BackendTier;

/// Index of the first tier, in priority order, that is not exhausted.
///
/// A position equal to the tier count means every tier is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingCursor {
    position: usize,
}

impl RoutingCursor {
    /// Cursor at the highest-priority tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move forward past every exhausted tier.
    pub fn advance_past(&mut self, tiers: &[BackendTier], registry: &ExhaustionRegistry) {
        while self.position < tiers.len() && registry.contains(&tiers[self.position].id) {
            self.position += 1;
        }
    }

    /// Return to the highest-priority tier.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}
