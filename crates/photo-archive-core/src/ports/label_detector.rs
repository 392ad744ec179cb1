//! LabelDetector port - 画像認識

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::envelope::ObjectLocator;
use crate::domain::errors::ArchiveError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
}

#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Labels of the stored image, best first.
    async fn detect_labels(
        &self,
        object: &ObjectLocator,
        min_confidence: f32,
        max_labels: usize,
    ) -> Result<Vec<Label>, ArchiveError>;
}
