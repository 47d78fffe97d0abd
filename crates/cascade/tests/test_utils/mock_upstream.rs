//! Mock upstream for testing.

use async_trait::async_trait;
use cascade::{BackendTier, UpstreamClient, UpstreamError, UpstreamErrorKind, UpstreamResponse};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Behavior configuration for one mock reply.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Succeed with the given text
    Success(String),
    /// Fail with the given HTTP status
    Status(u16),
}

/// Mock upstream client for testing.
///
/// Each tier answers from its own queue of scripted replies. Once a tier's
/// queue is empty it succeeds with `"<tier> reply <n>"`, where `n` counts
/// all calls made so far.
#[derive(Debug, Clone, Default)]
pub struct MockUpstream {
    script: Arc<Mutex<HashMap<String, VecDeque<MockBehavior>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockUpstream {
    /// Create a mock where every tier succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `behavior` for the next call to `tier_id`.
    pub fn then(self, tier_id: &str, behavior: MockBehavior) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(tier_id.to_string())
            .or_default()
            .push_back(behavior);
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Tier ids called, in order.
    pub fn called_tiers(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(tier, _)| tier.clone())
            .collect()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn call(
        &self,
        tier: &BackendTier,
        content: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((tier.id.clone(), content.to_string()));
            calls.len()
        };

        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(&tier.id)
            .and_then(VecDeque::pop_front);

        match next {
            None => Ok(UpstreamResponse::new(format!("{} reply {}", tier.id, count))),
            Some(MockBehavior::Success(text)) => Ok(UpstreamResponse::new(text)),
            Some(MockBehavior::Status(status)) => Err(UpstreamError::new(
                UpstreamErrorKind::from_status(status, "mock failure"),
            )),
        }
    }
}
