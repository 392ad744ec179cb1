//! Bucket notification configuration and the pure reconcile rules.
//!
//! The provider only accepts a full replacement of the configuration, so
//! every lifecycle step computes the complete next configuration from the
//! current one: entries that are not ours are carried over untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub topic_arn: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub queue_arn: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LambdaFunctionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lambda_function_arn: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
}

/// Full notification configuration of one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationConfiguration {
    #[serde(default)]
    pub topic_configurations: Vec<TopicConfiguration>,
    #[serde(default)]
    pub queue_configurations: Vec<QueueConfiguration>,
    #[serde(default)]
    pub lambda_function_configurations: Vec<LambdaFunctionConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bridge_configuration: Option<serde_json::Value>,
}

impl NotificationConfiguration {
    pub fn is_empty(&self) -> bool {
        self.topic_configurations.is_empty()
            && self.queue_configurations.is_empty()
            && self.lambda_function_configurations.is_empty()
            && self.event_bridge_configuration.is_none()
    }

    /// Target ARNs of `kind` configured for `event`.
    pub fn targets_for_event(&self, kind: TargetKind, event: &str) -> Vec<String> {
        let has = |events: &[String]| events.iter().any(|e| e == event);
        match kind {
            TargetKind::Topic => self
                .topic_configurations
                .iter()
                .filter(|c| has(&c.events))
                .map(|c| c.topic_arn.clone())
                .collect(),
            TargetKind::Queue => self
                .queue_configurations
                .iter()
                .filter(|c| has(&c.events))
                .map(|c| c.queue_arn.clone())
                .collect(),
            TargetKind::Function => self
                .lambda_function_configurations
                .iter()
                .filter(|c| has(&c.events))
                .map(|c| c.lambda_function_arn.clone())
                .collect(),
        }
    }
}

/// Which list of the configuration a link lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Queue,
    Topic,
    Function,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Queue => "queue",
            TargetKind::Topic => "topic",
            TargetKind::Function => "function",
        };
        f.write_str(s)
    }
}

/// One desired bucket → target wiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLink {
    pub kind: TargetKind,
    pub target_arn: String,
    pub events: Vec<String>,
}

impl NotificationLink {
    pub fn object_created(kind: TargetKind, target_arn: impl Into<String>) -> Self {
        Self {
            kind,
            target_arn: target_arn.into(),
            events: vec![OBJECT_CREATED_EVENT.to_string()],
        }
    }
}

/// Add `desired`, replacing any entry that already points at its target.
pub fn install(current: &NotificationConfiguration, desired: &NotificationLink) -> NotificationConfiguration {
    let mut next = uninstall(current, desired);
    match desired.kind {
        TargetKind::Topic => next.topic_configurations.push(TopicConfiguration {
            id: None,
            topic_arn: desired.target_arn.clone(),
            events: desired.events.clone(),
            filter: None,
        }),
        TargetKind::Queue => next.queue_configurations.push(QueueConfiguration {
            id: None,
            queue_arn: desired.target_arn.clone(),
            events: desired.events.clone(),
            filter: None,
        }),
        TargetKind::Function => next
            .lambda_function_configurations
            .push(LambdaFunctionConfiguration {
                id: None,
                lambda_function_arn: desired.target_arn.clone(),
                events: desired.events.clone(),
                filter: None,
            }),
    }
    next
}

/// Drop the entry of `old`, then install `desired`, in one replacement.
pub fn update(
    current: &NotificationConfiguration,
    old: &NotificationLink,
    desired: &NotificationLink,
) -> NotificationConfiguration {
    install(&uninstall(current, old), desired)
}

/// Remove only the entries that point at `ours`.
pub fn uninstall(current: &NotificationConfiguration, ours: &NotificationLink) -> NotificationConfiguration {
    let mut next = current.clone();
    let arn = ours.target_arn.as_str();
    match ours.kind {
        TargetKind::Topic => next.topic_configurations.retain(|c| c.topic_arn != arn),
        TargetKind::Queue => next.queue_configurations.retain(|c| c.queue_arn != arn),
        TargetKind::Function => next
            .lambda_function_configurations
            .retain(|c| c.lambda_function_arn != arn),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn queue(arn: &str) -> QueueConfiguration {
        QueueConfiguration {
            id: None,
            queue_arn: arn.to_string(),
            events: vec![OBJECT_CREATED_EVENT.to_string()],
            filter: None,
        }
    }

    #[test]
    fn update_replaces_old_queue_with_new() {
        let current = NotificationConfiguration {
            queue_configurations: vec![queue("old")],
            ..Default::default()
        };
        let next = update(
            &current,
            &NotificationLink::object_created(TargetKind::Queue, "old"),
            &NotificationLink::object_created(TargetKind::Queue, "new"),
        );

        assert_eq!(next.queue_configurations.len(), 1);
        assert_eq!(next.queue_configurations[0].queue_arn, "new");
        assert!(next.queue_configurations.iter().all(|c| c.queue_arn != "old"));
    }

    #[test]
    fn install_preserves_foreign_entries() {
        let current = NotificationConfiguration {
            queue_configurations: vec![queue("someone-else")],
            topic_configurations: vec![TopicConfiguration {
                id: Some("audit".into()),
                topic_arn: "arn:sns:audit".into(),
                events: vec!["s3:ObjectRemoved:*".into()],
                filter: Some(json!({"Key": {"FilterRules": []}})),
            }],
            ..Default::default()
        };
        let next = install(&current, &NotificationLink::object_created(TargetKind::Queue, "ours"));

        assert_eq!(next.queue_configurations.len(), 2);
        assert_eq!(next.topic_configurations, current.topic_configurations);
    }

    #[rstest]
    #[case::queue(TargetKind::Queue)]
    #[case::topic(TargetKind::Topic)]
    #[case::function(TargetKind::Function)]
    fn install_is_idempotent(#[case] kind: TargetKind) {
        let link = NotificationLink::object_created(kind, "arn:ours");
        let once = install(&NotificationConfiguration::default(), &link);
        let twice = install(&once, &link);
        assert_eq!(once, twice);
        assert_eq!(once.targets_for_event(kind, OBJECT_CREATED_EVENT), vec!["arn:ours"]);
    }

    #[test]
    fn uninstall_removes_only_ours() {
        let current = NotificationConfiguration {
            queue_configurations: vec![queue("ours"), queue("theirs")],
            ..Default::default()
        };
        let next = uninstall(&current, &NotificationLink::object_created(TargetKind::Queue, "ours"));
        assert_eq!(next.queue_configurations, vec![queue("theirs")]);
    }

    #[test]
    fn uninstall_of_other_kind_leaves_list_alone() {
        let current = NotificationConfiguration {
            queue_configurations: vec![queue("same-arn")],
            ..Default::default()
        };
        let next = uninstall(&current, &NotificationLink::object_created(TargetKind::Topic, "same-arn"));
        assert_eq!(next, current);
    }

    #[test]
    fn decodes_provider_shape() {
        let body = json!({
            "TopicConfigurations": [],
            "QueueConfigurations": [{"QueueArn": "arn:q", "Events": ["s3:ObjectCreated:*"]}],
            "LambdaFunctionConfigurations": []
        });
        let config: NotificationConfiguration = serde_json::from_value(body).unwrap();
        assert_eq!(
            config.targets_for_event(TargetKind::Queue, OBJECT_CREATED_EVENT),
            vec!["arn:q".to_string()]
        );
        assert!(!config.is_empty());
    }
}
