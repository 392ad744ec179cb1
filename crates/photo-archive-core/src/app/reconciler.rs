//! NotificationReconciler - bucket notification の custom resource handler
//!
//! Read the bucket's full configuration, compute the next one with the pure
//! rules in `domain::notification`, write it back as a full replacement.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::domain::custom_resource::{CustomResourceRequest, CustomResourceResponse, LinkProperties};
use crate::domain::errors::ArchiveError;
use crate::domain::notification::{self, NotificationConfiguration, NotificationLink, TargetKind};
use crate::ports::ObjectStore;

pub struct NotificationReconciler {
    kind: TargetKind,
    store: Arc<dyn ObjectStore>,
}

impl NotificationReconciler {
    pub fn new(kind: TargetKind, store: Arc<dyn ObjectStore>) -> Self {
        Self { kind, store }
    }

    pub fn physical_resource_id(&self, properties: &LinkProperties) -> String {
        format!("{}-{}-event-link", properties.bucket_name, self.kind)
    }

    /// Apply one lifecycle request. Returns the id of the link resource.
    #[tracing::instrument(skip_all, fields(kind = %self.kind, request = request.request_type()))]
    pub async fn handle(&self, request: &CustomResourceRequest) -> Result<String, ArchiveError> {
        match request {
            CustomResourceRequest::Create {
                resource_properties,
            } => {
                let link = resource_properties.link(self.kind);
                self.modify(&resource_properties.bucket_name, |current| {
                    notification::install(current, &link)
                })
                .await?;
                info!(bucket = %resource_properties.bucket_name, target = %link.target_arn, "notification installed");
                Ok(self.physical_resource_id(resource_properties))
            }

            CustomResourceRequest::Update {
                resource_properties,
                old_resource_properties,
                ..
            } => {
                let desired = resource_properties.link(self.kind);
                let old = old_resource_properties.link(self.kind);

                if old_resource_properties.bucket_name == resource_properties.bucket_name {
                    self.modify(&resource_properties.bucket_name, |current| {
                        notification::update(current, &old, &desired)
                    })
                    .await?;
                } else {
                    // bucket が変わった場合は旧 bucket から外して新 bucket に付ける
                    self.modify(&old_resource_properties.bucket_name, |current| {
                        notification::uninstall(current, &old)
                    })
                    .await?;
                    self.modify(&resource_properties.bucket_name, |current| {
                        notification::install(current, &desired)
                    })
                    .await?;
                }
                info!(
                    bucket = %resource_properties.bucket_name,
                    old = %old.target_arn,
                    new = %desired.target_arn,
                    "notification updated"
                );
                Ok(self.physical_resource_id(resource_properties))
            }

            CustomResourceRequest::Delete {
                physical_resource_id,
                resource_properties,
            } => {
                let link = resource_properties.link(self.kind);
                self.modify(&resource_properties.bucket_name, |current| {
                    notification::uninstall(current, &link)
                })
                .await?;
                info!(bucket = %resource_properties.bucket_name, target = %link.target_arn, "notification removed");
                Ok(physical_resource_id.clone())
            }
        }
    }

    /// Like [`Self::handle`], but never fails: errors become a `FAILED`
    /// response carrying the message as reason.
    pub async fn respond(&self, request: &CustomResourceRequest) -> CustomResourceResponse {
        match self.handle(request).await {
            Ok(id) => CustomResourceResponse::success(
                id,
                Some(json!({
                    "BucketName": request.properties().bucket_name,
                    "TargetArn": request.properties().target_arn,
                })),
            ),
            Err(err) => {
                warn!(error = %err, "custom resource request failed");
                let id = match request {
                    CustomResourceRequest::Create { .. } => None,
                    CustomResourceRequest::Update {
                        physical_resource_id,
                        ..
                    }
                    | CustomResourceRequest::Delete {
                        physical_resource_id,
                        ..
                    } => Some(physical_resource_id.clone()),
                };
                CustomResourceResponse::failed(id, err.to_string())
            }
        }
    }

    async fn modify<F>(&self, bucket: &str, change: F) -> Result<(), ArchiveError>
    where
        F: FnOnce(&NotificationConfiguration) -> NotificationConfiguration,
    {
        let current = self.store.get_notification_configuration(bucket).await?;
        let next = change(&current);
        if next == current {
            return Ok(());
        }
        self.store.put_notification_configuration(bucket, next).await
    }
}

/// Configuration after applying `request` to `current`, without any store.
///
/// A cross-bucket update is seen from the new bucket, i.e. as an install.
pub fn plan(kind: TargetKind, request: &CustomResourceRequest, current: &NotificationConfiguration) -> NotificationConfiguration {
    let desired: NotificationLink = request.properties().link(kind);
    match request {
        CustomResourceRequest::Create { .. } => notification::install(current, &desired),
        CustomResourceRequest::Update {
            resource_properties,
            old_resource_properties,
            ..
        } if old_resource_properties.bucket_name == resource_properties.bucket_name => {
            notification::update(current, &old_resource_properties.link(kind), &desired)
        }
        CustomResourceRequest::Update { .. } => notification::install(current, &desired),
        CustomResourceRequest::Delete { .. } => notification::uninstall(current, &desired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::custom_resource::ResponseStatus;
    use crate::domain::notification::OBJECT_CREATED_EVENT;
    use crate::impls::InMemoryObjectStore;

    fn props(bucket: &str, target: &str) -> LinkProperties {
        LinkProperties {
            bucket_name: bucket.to_string(),
            bucket_arn: None,
            target_arn: target.to_string(),
            events: None,
        }
    }

    async fn queues(store: &InMemoryObjectStore, bucket: &str) -> Vec<String> {
        store
            .get_notification_configuration(bucket)
            .await
            .unwrap()
            .targets_for_event(TargetKind::Queue, OBJECT_CREATED_EVENT)
    }

    #[tokio::test]
    async fn create_update_delete_lifecycle() {
        let store = Arc::new(InMemoryObjectStore::new());
        let reconciler = NotificationReconciler::new(TargetKind::Queue, store.clone());

        let id = reconciler
            .handle(&CustomResourceRequest::Create {
                resource_properties: props("photos", "arn:q:1"),
            })
            .await
            .unwrap();
        assert_eq!(id, "photos-queue-event-link");
        assert_eq!(queues(&store, "photos").await, vec!["arn:q:1"]);

        reconciler
            .handle(&CustomResourceRequest::Update {
                physical_resource_id: id.clone(),
                resource_properties: props("photos", "arn:q:2"),
                old_resource_properties: props("photos", "arn:q:1"),
            })
            .await
            .unwrap();
        assert_eq!(queues(&store, "photos").await, vec!["arn:q:2"]);

        reconciler
            .handle(&CustomResourceRequest::Delete {
                physical_resource_id: id,
                resource_properties: props("photos", "arn:q:2"),
            })
            .await
            .unwrap();
        assert!(store.get_notification_configuration("photos").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_across_buckets_moves_the_link() {
        let store = Arc::new(InMemoryObjectStore::new());
        let reconciler = NotificationReconciler::new(TargetKind::Queue, store.clone());
        reconciler
            .handle(&CustomResourceRequest::Create {
                resource_properties: props("old-bucket", "arn:q"),
            })
            .await
            .unwrap();

        reconciler
            .handle(&CustomResourceRequest::Update {
                physical_resource_id: "old-bucket-queue-event-link".into(),
                resource_properties: props("new-bucket", "arn:q"),
                old_resource_properties: props("old-bucket", "arn:q"),
            })
            .await
            .unwrap();

        assert!(queues(&store, "old-bucket").await.is_empty());
        assert_eq!(queues(&store, "new-bucket").await, vec!["arn:q"]);
    }

    #[tokio::test]
    async fn failure_becomes_failed_response() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.set_offline(true);
        let reconciler = NotificationReconciler::new(TargetKind::Topic, store);

        let response = reconciler
            .respond(&CustomResourceRequest::Delete {
                physical_resource_id: "photos-topic-event-link".into(),
                resource_properties: props("photos", "arn:sns"),
            })
            .await;

        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id.as_deref(), Some("photos-topic-event-link"));
        assert!(response.reason.unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn success_response_carries_id() {
        let store = Arc::new(InMemoryObjectStore::new());
        let reconciler = NotificationReconciler::new(TargetKind::Function, store);
        let response = reconciler
            .respond(&CustomResourceRequest::Create {
                resource_properties: props("photos", "arn:fn"),
            })
            .await;
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.physical_resource_id.as_deref(), Some("photos-function-event-link"));
    }

    #[test]
    fn plan_matches_handle_for_same_bucket() {
        let current = notification::install(
            &NotificationConfiguration::default(),
            &NotificationLink::object_created(TargetKind::Queue, "arn:q:1"),
        );
        let next = plan(
            TargetKind::Queue,
            &CustomResourceRequest::Update {
                physical_resource_id: "x".into(),
                resource_properties: props("photos", "arn:q:2"),
                old_resource_properties: props("photos", "arn:q:1"),
            },
            &current,
        );
        assert_eq!(next.targets_for_event(TargetKind::Queue, OBJECT_CREATED_EVENT), vec!["arn:q:2"]);
    }
}
