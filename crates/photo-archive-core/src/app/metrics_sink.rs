//! MetricsSink - metrics queue のコンシューマ
//!
//! Upserts one record per object: create when absent, merge otherwise.
//! Every write is conditional on the version that was read, so concurrent
//! feature results for the same object never overwrite each other; a lost
//! race is retried from a fresh read.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::envelope::ObjectLocator;
use crate::domain::errors::ArchiveError;
use crate::domain::metrics::{MetricsEvent, MetricsKey, MetricsRecord};
use crate::ports::{Clock, MetricsStore};

use super::retry::RetryPolicy;

pub struct MetricsSink {
    store: Arc<dyn MetricsStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl MetricsSink {
    pub fn new(store: Arc<dyn MetricsStore>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self { store, clock, retry }
    }

    #[tracing::instrument(skip(self, object, payload), fields(bucket = %object.bucket_name, key = %object.key))]
    pub async fn record_feature_result(
        &self,
        object: &ObjectLocator,
        feature: &str,
        payload: serde_json::Value,
    ) -> Result<MetricsRecord, ArchiveError> {
        let key = MetricsKey::for_object(&object.bucket_name, &object.key);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.upsert(&key, object, feature, &payload).await {
                Ok(record) => return Ok(record),
                Err(err @ ArchiveError::WriteConflict { .. }) if self.retry.should_retry(attempts) => {
                    let delay = self.retry.next_delay(attempts);
                    warn!(attempts, ?delay, error = %err, "metrics write conflict, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn upsert(
        &self,
        key: &MetricsKey,
        object: &ObjectLocator,
        feature: &str,
        payload: &serde_json::Value,
    ) -> Result<MetricsRecord, ArchiveError> {
        let now = self.clock.now();
        match self.store.get(key).await? {
            None => {
                let record = MetricsRecord::create(object, feature, payload.clone(), now);
                self.store.put(record.clone(), None).await?;
                debug!(%key, "metrics record created");
                Ok(record)
            }
            Some(existing) if existing.already_contains(feature, payload) => {
                debug!(%key, "metrics record already up to date");
                Ok(existing)
            }
            Some(existing) => {
                let record = existing.merge(feature, payload.clone(), now);
                self.store.put(record.clone(), Some(existing.version)).await?;
                debug!(%key, version = record.version, "metrics record merged");
                Ok(record)
            }
        }
    }

    /// Consume one metrics queue message.
    pub async fn handle_message(&self, body: &str) -> Result<MetricsRecord, ArchiveError> {
        let event: MetricsEvent = serde_json::from_str(body)?;
        self.record_feature_result(&event.object(), &event.feature_name, event.feature_data)
            .await
    }
}
