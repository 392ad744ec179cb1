//! JobEnvelope - feature chain の運搬用データ
//!
//! The envelope travels through every queue hop and every feature
//! invocation. It is an immutable value: the only way to change it is
//! [`crate::domain::processor::advance`], which returns a new envelope.
//!
//! Invariants checked on construction and on decode:
//! - feature names are unique;
//! - `numberOfFeaturesCompleted` equals the number of completed features;
//! - every available feature carries an invocation target.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::ArchiveError;
use super::feature::{FeatureName, FeatureState};
use super::ids::JobId;

/// Identity of the object a job processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectLocator {
    pub bucket_name: String,
    pub bucket_arn: String,
    pub key: String,
}

impl ObjectLocator {
    pub fn new(
        bucket_name: impl Into<String>,
        bucket_arn: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            bucket_arn: bucket_arn.into(),
            key: key.into(),
        }
    }

    /// Lower-cased file extension of the key, if any.
    pub fn extension(&self) -> Option<String> {
        let file = self.key.rsplit('/').next().unwrap_or(&self.key);
        file.rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Wire form of the envelope. Decoding goes through [`JobEnvelope::try_from`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
    #[serde(flatten)]
    object: ObjectLocator,
    features: Vec<FeatureState>,
    number_of_features_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeWire", into = "EnvelopeWire")]
pub struct JobEnvelope {
    job_id: Option<JobId>,
    object: ObjectLocator,
    features: Vec<FeatureState>,
    completed_count: usize,
}

impl JobEnvelope {
    /// Build an envelope from explicit parts, validating the invariants.
    pub fn new(
        job_id: Option<JobId>,
        object: ObjectLocator,
        features: Vec<FeatureState>,
        completed_count: usize,
    ) -> Result<Self, ArchiveError> {
        let envelope = Self {
            job_id,
            object,
            features,
            completed_count,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Start a new job: nothing is completed yet.
    pub fn new_job(
        job_id: JobId,
        object: ObjectLocator,
        features: Vec<FeatureState>,
    ) -> Result<Self, ArchiveError> {
        let features = features
            .into_iter()
            .map(|f| FeatureState {
                completed: false,
                ..f
            })
            .collect();
        Self::new(Some(job_id), object, features, 0)
    }

    pub fn from_json(body: &str) -> Result<Self, ArchiveError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn to_json(&self) -> Result<String, ArchiveError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn object(&self) -> &ObjectLocator {
        &self.object
    }

    pub fn features(&self) -> &[FeatureState] {
        &self.features
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureState> {
        self.features.iter().find(|f| f.name == *name)
    }

    pub fn is_done(&self) -> bool {
        self.completed_count == self.features.len()
    }

    /// Short label for logs: the job id when present, otherwise the key.
    pub fn label(&self) -> String {
        match self.job_id {
            Some(id) => id.to_string(),
            None => format!("{}/{}", self.object.bucket_name, self.object.key),
        }
    }

    /// Only the processor produces advanced envelopes.
    pub(crate) fn with_progress(&self, features: Vec<FeatureState>, completed_count: usize) -> Self {
        Self {
            job_id: self.job_id,
            object: self.object.clone(),
            features,
            completed_count,
        }
    }

    fn validate(&self) -> Result<(), ArchiveError> {
        let mut seen: HashSet<&FeatureName> = HashSet::with_capacity(self.features.len());
        for feature in &self.features {
            if !seen.insert(&feature.name) {
                return Err(ArchiveError::DuplicateFeature(feature.name.to_string()));
            }
            if feature.available && feature.lambda_arn.is_none() {
                return Err(ArchiveError::InvalidEnvelope(format!(
                    "available feature '{}' has no invocation target",
                    feature.name
                )));
            }
        }

        let completed = self.features.iter().filter(|f| f.completed).count();
        if completed != self.completed_count {
            return Err(ArchiveError::InvalidEnvelope(format!(
                "numberOfFeaturesCompleted is {} but {} features are completed",
                self.completed_count, completed
            )));
        }
        Ok(())
    }
}

impl TryFrom<EnvelopeWire> for JobEnvelope {
    type Error = ArchiveError;

    fn try_from(wire: EnvelopeWire) -> Result<Self, Self::Error> {
        JobEnvelope::new(
            wire.job_id,
            wire.object,
            wire.features,
            wire.number_of_features_completed,
        )
    }
}

impl From<JobEnvelope> for EnvelopeWire {
    fn from(envelope: JobEnvelope) -> Self {
        Self {
            job_id: envelope.job_id,
            object: envelope.object,
            features: envelope.features,
            number_of_features_completed: envelope.completed_count,
        }
    }
}
