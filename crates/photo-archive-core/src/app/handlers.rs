//! FeatureHandler / HandlerRegistry - invocation target → handler
//!
//! # 設計
//! - 初期化時に登録（mutable）
//! - 実行時は読み取りのみ（immutable, Arc で共有）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::envelope::JobEnvelope;
use crate::domain::errors::ArchiveError;
use crate::domain::feature::FeatureName;

use super::runner::FeatureRunOutcome;

/// Object-safe view of a feature runner.
#[async_trait]
pub trait FeatureHandler: Send + Sync {
    fn feature(&self) -> &FeatureName;

    async fn handle(&self, envelope: &JobEnvelope) -> Result<FeatureRunOutcome, ArchiveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a handler for target '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn FeatureHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        target: impl Into<String>,
        handler: Arc<dyn FeatureHandler>,
    ) -> Result<(), RegistryError> {
        let target = target.into();
        if self.handlers.contains_key(&target) {
            return Err(RegistryError::AlreadyRegistered(target));
        }
        self.handlers.insert(target, handler);
        Ok(())
    }

    pub fn get(&self, target: &str) -> Option<Arc<dyn FeatureHandler>> {
        self.handlers.get(target).cloned()
    }

    pub fn registered_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.handlers.keys().cloned().collect();
        targets.sort();
        targets
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route one invocation to the handler registered for `target`.
    pub async fn execute(&self, target: &str, envelope: &JobEnvelope) -> Result<FeatureRunOutcome, ArchiveError> {
        let handler = self
            .get(target)
            .ok_or_else(|| ArchiveError::InvalidRequest(format!("no handler registered for target '{target}'")))?;
        handler.handle(envelope).await
    }
}
