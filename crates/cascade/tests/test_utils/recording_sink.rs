//! Usage sinks for testing.

use async_trait::async_trait;
use cascade::{CascadeResult, StorageError, StorageErrorKind, UsageRecord, UsageSink};
use std::sync::{Arc, Mutex};

/// Keeps every record it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<UsageRecord>>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageSink for RecordingSink {
    async fn record(&self, record: &UsageRecord) -> CascadeResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Rejects every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

#[async_trait]
impl UsageSink for FailingSink {
    async fn record(&self, _record: &UsageRecord) -> CascadeResult<()> {
        Err(StorageError::new(StorageErrorKind::FileWrite("sink offline".to_string())).into())
    }
}
