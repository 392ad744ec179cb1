//! StaticLabelDetector - 固定ラベルを返す LabelDetector

use async_trait::async_trait;

use crate::domain::envelope::ObjectLocator;
use crate::domain::errors::ArchiveError;
use crate::ports::{Label, LabelDetector};

/// Returns the same configured labels for every image, applying the
/// confidence and count limits like the real service does.
#[derive(Debug, Clone, Default)]
pub struct StaticLabelDetector {
    labels: Vec<Label>,
    unavailable: bool,
}

impl StaticLabelDetector {
    pub fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl LabelDetector for StaticLabelDetector {
    async fn detect_labels(
        &self,
        _object: &ObjectLocator,
        min_confidence: f32,
        max_labels: usize,
    ) -> Result<Vec<Label>, ArchiveError> {
        if self.unavailable {
            return Err(ArchiveError::upstream("recognition", "service unavailable"));
        }
        let mut kept: Vec<Label> = self
            .labels
            .iter()
            .filter(|l| l.confidence >= min_confidence)
            .cloned()
            .collect();
        kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        kept.truncate(max_labels);
        Ok(kept)
    }
}
