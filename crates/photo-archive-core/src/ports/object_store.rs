//! ObjectStore port - オブジェクトストレージ（本体・タグ・通知設定）

use async_trait::async_trait;

use crate::domain::envelope::ObjectLocator;
use crate::domain::errors::ArchiveError;
use crate::domain::notification::NotificationConfiguration;
use crate::domain::tags::TagSet;

/// Tags together with the version they were read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTags {
    pub tags: TagSet,
    pub version: u64,
}

/// ObjectStore はオブジェクトとそのメタデータを扱う
///
/// # 設計原則
/// - タグ更新は read-modify-write を 1 回の条件付き書き込みで行う
///   （`put_tags` の `expected_version` が一致しなければ `WriteConflict`）
/// - 通知設定は常に全置換
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, object: &ObjectLocator) -> Result<Vec<u8>, ArchiveError>;

    async fn get_tags(&self, object: &ObjectLocator) -> Result<VersionedTags, ArchiveError>;

    async fn put_tags(
        &self,
        object: &ObjectLocator,
        tags: TagSet,
        expected_version: u64,
    ) -> Result<(), ArchiveError>;

    async fn get_notification_configuration(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration, ArchiveError>;

    async fn put_notification_configuration(
        &self,
        bucket: &str,
        configuration: NotificationConfiguration,
    ) -> Result<(), ArchiveError>;
}
