//! AppBuilder - feature handler の登録と起動時検証
//!
//! # Fail-fast 設計
//! - expect_targets() で期待される invocation target を登録
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す（invocation が行き先を失わないように）

use std::sync::Arc;

use super::handlers::{FeatureHandler, HandlerRegistry, RegistryError};

/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .register("arn:hash", Arc::new(hash_runner))?
///     .expect_targets(&["arn:hash"])
///     .build()?;
/// ```
pub struct AppBuilder {
    registry: HandlerRegistry,
    expected_targets: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing handlers for targets {0:?}; they are expected but not registered")]
    MissingTargets(Vec<String>),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            expected_targets: None,
        }
    }

    pub fn register(
        mut self,
        target: impl Into<String>,
        handler: Arc<dyn FeatureHandler>,
    ) -> Result<Self, BuildError> {
        self.registry.register(target, handler)?;
        Ok(self)
    }

    pub fn expect_targets(mut self, targets: &[&str]) -> Self {
        self.expected_targets = Some(targets.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected) = &self.expected_targets {
            let registered = self.registry.registered_targets();
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !registered.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTargets(missing));
            }
        }
        Ok(App {
            handlers: Arc::new(self.registry),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated set of feature handlers, shared read-only at run time.
pub struct App {
    pub handlers: Arc<HandlerRegistry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::runner::{FeatureRunOutcome, RunStatus};
    use crate::domain::envelope::JobEnvelope;
    use crate::domain::errors::ArchiveError;
    use crate::domain::feature::FeatureName;
    use async_trait::async_trait;

    struct Noop(FeatureName);

    #[async_trait]
    impl FeatureHandler for Noop {
        fn feature(&self) -> &FeatureName {
            &self.0
        }

        async fn handle(&self, _envelope: &JobEnvelope) -> Result<FeatureRunOutcome, ArchiveError> {
            Ok(FeatureRunOutcome {
                feature: self.0.clone(),
                status: RunStatus::Applied,
                forwarded: None,
            })
        }
    }

    fn noop(name: &str) -> Arc<dyn FeatureHandler> {
        Arc::new(Noop(FeatureName::new(name)))
    }

    #[test]
    fn build_success() {
        let app = AppBuilder::new()
            .register("arn:hash", noop("hash"))
            .unwrap()
            .expect_targets(&["arn:hash"])
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn build_missing_targets() {
        let app = AppBuilder::new()
            .register("arn:hash", noop("hash"))
            .unwrap()
            .expect_targets(&["arn:hash", "arn:meta"])
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingTargets(missing)) if missing == vec!["arn:meta".to_string()]
        ));
    }

    #[test]
    fn build_without_expectations() {
        let app = AppBuilder::new().register("arn:hash", noop("hash")).unwrap().build();
        assert_eq!(app.unwrap().handlers.len(), 1);
    }

    #[test]
    fn duplicate_target_fails_registration() {
        let result = AppBuilder::new()
            .register("arn:hash", noop("hash"))
            .unwrap()
            .register("arn:hash", noop("hash2"));
        assert!(matches!(result, Err(BuildError::Registry(RegistryError::AlreadyRegistered(_)))));
    }
}
