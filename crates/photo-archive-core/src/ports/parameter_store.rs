//! ParameterStore port - 設定値ストア（feature registry の保存先）

use async_trait::async_trait;

use crate::domain::errors::ArchiveError;

/// Key/value parameter store.
///
/// `Ok(None)` means the parameter does not exist; an unreachable store is an
/// `UpstreamUnavailable` error and must not be read as "missing".
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<Option<String>, ArchiveError>;
}
