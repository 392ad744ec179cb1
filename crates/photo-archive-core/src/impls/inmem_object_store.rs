//! InMemoryObjectStore - 開発用のオブジェクトストレージ
//!
//! Objects are addressed by (bucket name, key). Tag writes are conditional
//! on the version returned by `get_tags`, which lets tests observe lost
//! updates as `WriteConflict`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::envelope::ObjectLocator;
use crate::domain::errors::ArchiveError;
use crate::domain::notification::NotificationConfiguration;
use crate::domain::tags::TagSet;
use crate::ports::{ObjectStore, VersionedTags};

#[derive(Debug, Clone, Default)]
struct StoredObject {
    body: Vec<u8>,
    tags: TagSet,
    tag_version: u64,
}

#[derive(Default)]
struct State {
    objects: HashMap<(String, String), StoredObject>,
    notifications: HashMap<String, NotificationConfiguration>,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) {
        let mut state = self.state.lock().await;
        let entry = state
            .objects
            .entry((bucket.to_string(), key.to_string()))
            .or_default();
        entry.body = body;
    }

    /// Current tags of an object, `None` if the object does not exist.
    pub async fn tags_of(&self, bucket: &str, key: &str) -> Option<TagSet> {
        let state = self.state.lock().await;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.tags.clone())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::upstream("object store", "offline"));
        }
        Ok(())
    }

    fn not_found(object: &ObjectLocator) -> ArchiveError {
        ArchiveError::InvalidRequest(format!(
            "no such object {}/{}",
            object.bucket_name, object.key
        ))
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, object: &ObjectLocator) -> Result<Vec<u8>, ArchiveError> {
        self.check_online()?;
        let state = self.state.lock().await;
        state
            .objects
            .get(&(object.bucket_name.clone(), object.key.clone()))
            .map(|o| o.body.clone())
            .ok_or_else(|| Self::not_found(object))
    }

    async fn get_tags(&self, object: &ObjectLocator) -> Result<VersionedTags, ArchiveError> {
        self.check_online()?;
        let state = self.state.lock().await;
        state
            .objects
            .get(&(object.bucket_name.clone(), object.key.clone()))
            .map(|o| VersionedTags {
                tags: o.tags.clone(),
                version: o.tag_version,
            })
            .ok_or_else(|| Self::not_found(object))
    }

    async fn put_tags(
        &self,
        object: &ObjectLocator,
        tags: TagSet,
        expected_version: u64,
    ) -> Result<(), ArchiveError> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let stored = state
            .objects
            .get_mut(&(object.bucket_name.clone(), object.key.clone()))
            .ok_or_else(|| Self::not_found(object))?;

        if stored.tag_version != expected_version {
            return Err(ArchiveError::WriteConflict {
                resource: format!("tags of {}/{}", object.bucket_name, object.key),
                expected: Some(expected_version),
                actual: Some(stored.tag_version),
            });
        }
        stored.tags = tags;
        stored.tag_version += 1;
        Ok(())
    }

    async fn get_notification_configuration(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration, ArchiveError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state.notifications.get(bucket).cloned().unwrap_or_default())
    }

    async fn put_notification_configuration(
        &self,
        bucket: &str,
        configuration: NotificationConfiguration,
    ) -> Result<(), ArchiveError> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        state.notifications.insert(bucket.to_string(), configuration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tags::Tag;

    fn object() -> ObjectLocator {
        ObjectLocator::new("photos", "arn:aws:s3:::photos", "a.jpg")
    }

    #[tokio::test]
    async fn conditional_tag_write_detects_lost_update() {
        let store = InMemoryObjectStore::new();
        store.put_object("photos", "a.jpg", b"img".to_vec()).await;

        let read = store.get_tags(&object()).await.unwrap();
        store
            .put_tags(&object(), TagSet::new(vec![Tag::new("A", "1")]), read.version)
            .await
            .unwrap();

        // 古い version での書き込みは衝突
        let err = store
            .put_tags(&object(), TagSet::new(vec![Tag::new("B", "2")]), read.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::WriteConflict { .. }));
        assert_eq!(
            store.tags_of("photos", "a.jpg").await.unwrap().get("A"),
            Some("1")
        );
    }

    #[tokio::test]
    async fn missing_object_is_an_error() {
        let store = InMemoryObjectStore::new();
        assert!(store.get_object(&object()).await.is_err());
    }

    #[tokio::test]
    async fn notification_configuration_defaults_to_empty() {
        let store = InMemoryObjectStore::new();
        let config = store.get_notification_configuration("photos").await.unwrap();
        assert!(config.is_empty());
    }
}
