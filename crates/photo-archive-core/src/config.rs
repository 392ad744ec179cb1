//! Pipeline configuration.
//!
//! Loaded from a JSON file (camelCase keys) and/or overridden by the entry
//! point from environment variables. Every field has a default so a partial
//! file is enough.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::retry::RetryPolicy;
use crate::domain::errors::ArchiveError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecognitionConfig {
    pub min_confidence: f32,
    pub max_labels: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 75.0,
            max_labels: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 50,
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Prefix of every feature registry parameter (`/{prefix}/features/...`).
    pub settings_prefix: String,
    pub request_queue_url: String,
    /// Metrics are only published when this is set.
    pub metrics_queue_url: Option<String>,
    pub rekognition: RecognitionConfig,
    pub metrics_retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settings_prefix: "pa".to_string(),
            request_queue_url: "request-queue".to_string(),
            metrics_queue_url: None,
            rekognition: RecognitionConfig::default(),
            metrics_retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(body: &str) -> Result<Self, ArchiveError> {
        let config: Self = serde_json::from_str(body)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path).map_err(|e| {
            ArchiveError::InvalidRequest(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&body)
    }

    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.settings_prefix.trim().is_empty() {
            return Err(ArchiveError::InvalidRequest("settingsPrefix is empty".into()));
        }
        if self.request_queue_url.trim().is_empty() {
            return Err(ArchiveError::InvalidRequest("requestQueueUrl is empty".into()));
        }
        if matches!(&self.metrics_queue_url, Some(url) if url.trim().is_empty()) {
            return Err(ArchiveError::InvalidRequest("metricsQueueUrl is empty".into()));
        }
        if !(0.0..=100.0).contains(&self.rekognition.min_confidence) {
            return Err(ArchiveError::InvalidRequest(format!(
                "rekognition.minConfidence {} is outside 0..=100",
                self.rekognition.min_confidence
            )));
        }
        if self.rekognition.max_labels == 0 {
            return Err(ArchiveError::InvalidRequest("rekognition.maxLabels must be positive".into()));
        }
        let multiplier = self.metrics_retry.multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ArchiveError::InvalidRequest(format!(
                "metricsRetry.multiplier {multiplier} must be a finite number >= 1"
            )));
        }
        if self.metrics_retry.max_attempts == 0 {
            return Err(ArchiveError::InvalidRequest("metricsRetry.maxAttempts must be positive".into()));
        }
        Ok(())
    }
}
