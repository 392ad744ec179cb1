//! Feature registry backed by the parameter store.
//!
//! Parameter layout (`{prefix}` defaults to `pa`):
//!
//! ```text
//! /{prefix}/features                     comma separated feature names (job order)
//! /{prefix}/features/{name}/enabled      TRUE | FALSE
//! /{prefix}/features/{name}/lambda/arn   invocation target
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::ArchiveError;
use crate::domain::feature::{FeatureDefinition, FeatureName};
use crate::ports::ParameterStore;

pub struct FeatureRegistry {
    store: Arc<dyn ParameterStore>,
    prefix: String,
}

impl FeatureRegistry {
    pub fn new(store: Arc<dyn ParameterStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn features_key(&self) -> String {
        format!("/{}/features", self.prefix)
    }

    pub fn enabled_key(&self, feature: &str) -> String {
        format!("/{}/features/{}/enabled", self.prefix, feature)
    }

    pub fn target_key(&self, feature: &str) -> String {
        format!("/{}/features/{}/lambda/arn", self.prefix, feature)
    }

    /// Ordered feature definitions for a new job.
    ///
    /// A missing feature list means no features. Missing per-feature
    /// parameters mean "disabled". Store failures propagate.
    pub async fn load(&self) -> Result<Vec<FeatureDefinition>, ArchiveError> {
        let Some(list) = self.store.get_parameter(&self.features_key()).await? else {
            debug!(key = %self.features_key(), "feature list not found");
            return Ok(Vec::new());
        };

        let mut definitions = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let enabled = self.is_enabled(name).await?;
            let target = if enabled {
                self.store.get_parameter(&self.target_key(name)).await?
            } else {
                None
            };
            definitions.push(FeatureDefinition {
                name: FeatureName::new(name),
                enabled,
                target,
            });
        }
        Ok(definitions)
    }

    pub async fn is_enabled(&self, feature: &str) -> Result<bool, ArchiveError> {
        let value = self.store.get_parameter(&self.enabled_key(feature)).await?;
        Ok(matches!(value.as_deref(), Some(v) if v.trim().eq_ignore_ascii_case("true")))
    }
}
