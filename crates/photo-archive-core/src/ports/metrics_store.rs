//! MetricsStore port - オブジェクトごとの metrics record の保存先

use async_trait::async_trait;

use crate::domain::errors::ArchiveError;
use crate::domain::metrics::{MetricsKey, MetricsRecord};

/// Keyed record store with conditional writes.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn get(&self, key: &MetricsKey) -> Result<Option<MetricsRecord>, ArchiveError>;

    /// Write `record`.
    ///
    /// `expected_version = None` means "only if absent"; `Some(v)` means
    /// "only if the stored record is at version v". Otherwise
    /// `WriteConflict`.
    async fn put(&self, record: MetricsRecord, expected_version: Option<u64>) -> Result<(), ArchiveError>;
}
