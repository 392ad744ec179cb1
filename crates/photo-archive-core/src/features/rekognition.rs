//! Image label tags from the recognition service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::runner::{FeatureContext, FeatureResult, FeatureStrategy};
use crate::config::RecognitionConfig;
use crate::domain::errors::ArchiveError;
use crate::domain::tags::{MAX_TAG_VALUE_LEN, Tag};
use crate::ports::{Label, LabelDetector};

pub const DETECTED_KEY: &str = "DetectedInPhoto";

/// The recognition service only reads these formats.
pub const RECOGNIZABLE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct RekognitionStrategy {
    detector: Arc<dyn LabelDetector>,
    config: RecognitionConfig,
}

impl RekognitionStrategy {
    pub fn new(detector: Arc<dyn LabelDetector>, config: RecognitionConfig) -> Self {
        Self { detector, config }
    }
}

/// Comma-joined label names, cut at a label boundary to fit a tag value.
pub fn label_tag_value(labels: &[Label]) -> String {
    let mut value = String::new();
    for label in labels {
        let extra = if value.is_empty() { 0 } else { 1 };
        if value.chars().count() + extra + label.name.chars().count() > MAX_TAG_VALUE_LEN {
            break;
        }
        if extra == 1 {
            value.push(',');
        }
        value.push_str(&label.name);
    }
    value
}

#[async_trait]
impl FeatureStrategy for RekognitionStrategy {
    fn tag_keys(&self) -> &[&'static str] {
        &[DETECTED_KEY]
    }

    async fn apply(&self, ctx: FeatureContext<'_>) -> Result<FeatureResult, ArchiveError> {
        match ctx.object.extension() {
            Some(ext) if RECOGNIZABLE_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Ok(FeatureResult::NotApplicable {
                    reason: format!("'{}' is not a recognizable image", ctx.object.key),
                });
            }
        }

        let labels = self
            .detector
            .detect_labels(ctx.object, self.config.min_confidence, self.config.max_labels)
            .await?;

        Ok(FeatureResult::Applied {
            tags: vec![Tag::new(DETECTED_KEY, label_tag_value(&labels))],
            data: serde_json::to_value(&labels)?,
        })
    }
}
