//! Feature identity and per-job feature state.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureName(String);

impl FeatureName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq<str> for FeatureName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// One entry of an envelope's feature list.
///
/// `available` is fixed when the job is created from the feature registry.
/// `completed` starts false and only the processor flips it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureState {
    pub name: FeatureName,
    pub completed: bool,
    pub available: bool,
    /// Invocation target of the feature; `null` when it is not available.
    #[serde(default)]
    pub lambda_arn: Option<String>,
}

impl FeatureState {
    /// A fresh, not yet completed feature that can be invoked at `target`.
    pub fn available(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: FeatureName::new(name),
            completed: false,
            available: true,
            lambda_arn: Some(target.into()),
        }
    }

    /// A feature that is listed but disabled for this job.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            name: FeatureName::new(name),
            completed: false,
            available: false,
            lambda_arn: None,
        }
    }

    pub fn is_runnable(&self) -> bool {
        self.available && !self.completed
    }

    pub fn target(&self) -> Option<&str> {
        self.lambda_arn.as_deref()
    }
}

/// Registry view of a feature: whether it is switched on and where it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub name: FeatureName,
    pub enabled: bool,
    pub target: Option<String>,
}

impl FeatureDefinition {
    /// Materialize the definition into the initial per-job state.
    ///
    /// A feature is available only when it is enabled and has a target.
    pub fn to_state(&self) -> FeatureState {
        match (&self.target, self.enabled) {
            (Some(target), true) => FeatureState::available(self.name.as_str(), target.as_str()),
            _ => FeatureState::unavailable(self.name.as_str()),
        }
    }
}
