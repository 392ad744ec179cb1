//! Per-object metrics record and its merge rules.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use super::envelope::ObjectLocator;

/// Message a feature handler publishes to the metrics queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsEvent {
    pub bucket: String,
    pub key: String,
    pub bucket_arn: String,
    pub feature_name: String,
    pub feature_data: serde_json::Value,
}

impl MetricsEvent {
    pub fn new(object: &ObjectLocator, feature_name: &str, feature_data: serde_json::Value) -> Self {
        Self {
            bucket: object.bucket_name.clone(),
            key: object.key.clone(),
            bucket_arn: object.bucket_arn.clone(),
            feature_name: feature_name.to_string(),
            feature_data,
        }
    }

    pub fn object(&self) -> ObjectLocator {
        ObjectLocator::new(&self.bucket, &self.bucket_arn, &self.key)
    }
}

/// Deterministic record key derived from (bucket, key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsKey(String);

impl MetricsKey {
    /// SHA-1 over `"{bucket}/{key}"`, URL-safe base64.
    ///
    /// Bucket names cannot contain `/`, so distinct pairs never collide on
    /// the joined input.
    pub fn for_object(bucket: &str, key: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bucket.as_bytes());
        hasher.update(b"/");
        hasher.update(key.as_bytes());
        Self(URL_SAFE.encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub hash: MetricsKey,
    pub bucket: String,
    pub key: String,
    pub bucket_arn: String,
    pub features_applied: BTreeSet<String>,
    pub feature_data: BTreeMap<String, serde_json::Value>,
    /// Incremented on every write; used for conditional puts.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl MetricsRecord {
    /// First write for an object.
    pub fn create(
        object: &ObjectLocator,
        feature_name: &str,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: MetricsKey::for_object(&object.bucket_name, &object.key),
            bucket: object.bucket_name.clone(),
            key: object.key.clone(),
            bucket_arn: object.bucket_arn.clone(),
            features_applied: BTreeSet::from([feature_name.to_string()]),
            feature_data: BTreeMap::from([(feature_name.to_string(), payload)]),
            version: 1,
            updated_at: now,
        }
    }

    /// Merge one feature result into an existing record.
    ///
    /// Set semantics for `featuresApplied`, last write wins per feature in
    /// `featureData`. Other features' data is kept as is.
    pub fn merge(&self, feature_name: &str, payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.features_applied.insert(feature_name.to_string());
        next.feature_data.insert(feature_name.to_string(), payload);
        next.version = self.version + 1;
        next.updated_at = now;
        next
    }

    /// True when merging would not change the record's content.
    pub fn already_contains(&self, feature_name: &str, payload: &serde_json::Value) -> bool {
        self.features_applied.contains(feature_name)
            && self.feature_data.get(feature_name) == Some(payload)
    }
}
