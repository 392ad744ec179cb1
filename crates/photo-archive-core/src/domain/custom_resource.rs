//! Custom-resource lifecycle messages (request / response).
//!
//! Fields the handlers do not need (service token, response url, stack id,
//! ...) are ignored on decode.

use serde::{Deserialize, Serialize};

use super::notification::{NotificationLink, OBJECT_CREATED_EVENT, TargetKind};

/// Properties of a bucket → target link resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkProperties {
    pub bucket_name: String,
    #[serde(default)]
    pub bucket_arn: Option<String>,
    #[serde(
        alias = "queueArn",
        alias = "snsTopicArn",
        alias = "topicArn",
        alias = "functionArn",
        alias = "lambdaArn"
    )]
    pub target_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
}

impl LinkProperties {
    pub fn link(&self, kind: TargetKind) -> NotificationLink {
        NotificationLink {
            kind,
            target_arn: self.target_arn.clone(),
            events: self
                .events
                .clone()
                .filter(|events| !events.is_empty())
                .unwrap_or_else(|| vec![OBJECT_CREATED_EVENT.to_string()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "RequestType")]
pub enum CustomResourceRequest {
    #[serde(rename_all = "PascalCase")]
    Create { resource_properties: LinkProperties },

    #[serde(rename_all = "PascalCase")]
    Update {
        physical_resource_id: String,
        resource_properties: LinkProperties,
        old_resource_properties: LinkProperties,
    },

    #[serde(rename_all = "PascalCase")]
    Delete {
        physical_resource_id: String,
        resource_properties: LinkProperties,
    },
}

impl CustomResourceRequest {
    pub fn request_type(&self) -> &'static str {
        match self {
            CustomResourceRequest::Create { .. } => "Create",
            CustomResourceRequest::Update { .. } => "Update",
            CustomResourceRequest::Delete { .. } => "Delete",
        }
    }

    pub fn properties(&self) -> &LinkProperties {
        match self {
            CustomResourceRequest::Create {
                resource_properties,
            }
            | CustomResourceRequest::Update {
                resource_properties,
                ..
            }
            | CustomResourceRequest::Delete {
                resource_properties,
                ..
            } => resource_properties,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CustomResourceResponse {
    pub fn success(physical_resource_id: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::Success,
            physical_resource_id: Some(physical_resource_id.into()),
            data,
            reason: None,
        }
    }

    pub fn failed(physical_resource_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            physical_resource_id,
            data: None,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_update_with_legacy_property_names() {
        let body = json!({
            "RequestType": "Update",
            "ServiceToken": "arn:aws:lambda:token",
            "PhysicalResourceId": "photos-queue-event-link",
            "ResourceProperties": {"bucketName": "photos", "bucketArn": "arn:s3:photos", "queueArn": "arn:q:new"},
            "OldResourceProperties": {"bucketName": "photos", "bucketArn": "arn:s3:photos", "queueArn": "arn:q:old"}
        });
        let request: CustomResourceRequest = serde_json::from_value(body).unwrap();

        match &request {
            CustomResourceRequest::Update {
                physical_resource_id,
                resource_properties,
                old_resource_properties,
            } => {
                assert_eq!(physical_resource_id, "photos-queue-event-link");
                assert_eq!(resource_properties.target_arn, "arn:q:new");
                assert_eq!(old_resource_properties.target_arn, "arn:q:old");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(request.request_type(), "Update");
    }

    #[test]
    fn topic_property_name_is_accepted() {
        let body = json!({
            "RequestType": "Create",
            "ResourceProperties": {"bucketName": "photos", "snsTopicArn": "arn:sns:t"}
        });
        let request: CustomResourceRequest = serde_json::from_value(body).unwrap();
        let link = request.properties().link(TargetKind::Topic);
        assert_eq!(link.target_arn, "arn:sns:t");
        assert_eq!(link.events, vec![OBJECT_CREATED_EVENT.to_string()]);
    }

    #[test]
    fn unknown_request_type_is_rejected() {
        let body = json!({"RequestType": "Rollback", "ResourceProperties": {}});
        assert!(serde_json::from_value::<CustomResourceRequest>(body).is_err());
    }

    #[test]
    fn response_wire_shape() {
        let v = serde_json::to_value(CustomResourceResponse::success("id-1", None)).unwrap();
        assert_eq!(v, json!({"Status": "SUCCESS", "PhysicalResourceId": "id-1"}));

        let v = serde_json::to_value(CustomResourceResponse::failed(None, "boom")).unwrap();
        assert_eq!(v, json!({"Status": "FAILED", "Reason": "boom"}));
    }
}
