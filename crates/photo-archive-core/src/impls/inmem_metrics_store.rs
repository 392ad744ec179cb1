//! InMemoryMetricsStore - 開発用の metrics record ストア

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::ArchiveError;
use crate::domain::metrics::{MetricsKey, MetricsRecord};
use crate::ports::MetricsStore;

#[derive(Default)]
pub struct InMemoryMetricsStore {
    records: Mutex<HashMap<MetricsKey, MetricsRecord>>,
    offline: AtomicBool,
    /// Number of upcoming `put` calls that report a conflict.
    injected_conflicts: AtomicUsize,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `n` writes lose against an imaginary concurrent writer.
    pub fn inject_conflicts(&self, n: usize) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<MetricsRecord> {
        let records = self.records.lock().await;
        let mut all: Vec<MetricsRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| (&a.bucket, &a.key).cmp(&(&b.bucket, &b.key)));
        all
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn get(&self, key: &MetricsKey) -> Result<Option<MetricsRecord>, ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::upstream("metrics store", "offline"));
        }
        let records = self.records.lock().await;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, record: MetricsRecord, expected_version: Option<u64>) -> Result<(), ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::upstream("metrics store", "offline"));
        }

        let mut records = self.records.lock().await;
        let actual = records.get(&record.hash).map(|r| r.version);

        let injected = self
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || actual != expected_version {
            return Err(ArchiveError::WriteConflict {
                resource: format!("metrics record {}", record.hash),
                expected: expected_version,
                actual,
            });
        }

        records.insert(record.hash.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::ObjectLocator;
    use chrono::Utc;
    use serde_json::json;

    fn record() -> MetricsRecord {
        let object = ObjectLocator::new("photos", "arn", "a.jpg");
        MetricsRecord::create(&object, "hash", json!({}), Utc::now())
    }

    #[tokio::test]
    async fn create_only_if_absent() {
        let store = InMemoryMetricsStore::new();
        store.put(record(), None).await.unwrap();
        let err = store.put(record(), None).await.unwrap_err();
        assert!(matches!(err, ArchiveError::WriteConflict { actual: Some(1), .. }));
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed() {
        let store = InMemoryMetricsStore::new();
        store.inject_conflicts(1);
        assert!(store.put(record(), None).await.is_err());
        assert!(store.put(record(), None).await.is_ok());
        assert_eq!(store.records().await.len(), 1);
    }
}
