//! Object-created notifications as delivered by the storage layer.
//!
//! A message can arrive raw or wrapped in a topic envelope whose `Message`
//! field holds the notification as a JSON string.

use serde::Deserialize;

use super::envelope::ObjectLocator;
use super::errors::ArchiveError;

const TEST_EVENT: &str = "s3:TestEvent";

#[derive(Debug, Deserialize)]
struct TopicEnvelope {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records")]
    records: Option<Vec<Record>>,
    #[serde(rename = "Event")]
    event: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "eventTime")]
    event_time: Option<String>,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Bucket,
    object: Object,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    name: String,
    arn: String,
}

#[derive(Debug, Deserialize)]
struct Object {
    key: String,
    sequencer: Option<String>,
}

/// One object-created record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedObject {
    pub object: ObjectLocator,
    /// Identifies this event among events on the same key: the object
    /// `sequencer`, else the `eventTime`. `None` for hand-written messages.
    pub sequencer: Option<String>,
}

/// Result of reading one notification message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageNotification {
    /// Connectivity check sent when notifications are configured.
    TestEvent,
    ObjectsCreated(Vec<CreatedObject>),
}

impl StorageNotification {
    pub fn parse(body: &str) -> Result<Self, ArchiveError> {
        let value: serde_json::Value = serde_json::from_str(body)?;

        // topic 経由の場合は Message の中身が本体
        let value = match serde_json::from_value::<TopicEnvelope>(value.clone()) {
            Ok(wrapped) => serde_json::from_str(&wrapped.message)?,
            Err(_) => value,
        };

        let notification: Notification = serde_json::from_value(value)?;
        match (notification.records, notification.event) {
            (Some(records), _) => records
                .into_iter()
                .map(|r| {
                    Ok(CreatedObject {
                        object: ObjectLocator::new(
                            r.s3.bucket.name,
                            r.s3.bucket.arn,
                            decode_key(&r.s3.object.key)?,
                        ),
                        sequencer: r.s3.object.sequencer.or(r.event_time),
                    })
                })
                .collect::<Result<Vec<_>, ArchiveError>>()
                .map(StorageNotification::ObjectsCreated),
            (None, Some(event)) if event == TEST_EVENT => Ok(StorageNotification::TestEvent),
            (None, event) => Err(ArchiveError::InvalidRequest(format!(
                "notification has no Records (Event={event:?})"
            ))),
        }
    }
}

/// Keys arrive form-encoded: `+` is a space, the rest is percent-encoded.
pub fn decode_key(raw: &str) -> Result<String, ArchiveError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ArchiveError::InvalidRequest(format!("undecodable key '{raw}': {e}")))
}
