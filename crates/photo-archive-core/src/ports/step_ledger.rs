//! StepLedger port - 一度だけ実行すべき副作用の記録

use async_trait::async_trait;

use crate::domain::errors::ArchiveError;
use crate::domain::step::StepKey;

/// Set of steps already taken, with a conditional insert.
#[async_trait]
pub trait StepLedger: Send + Sync {
    async fn contains(&self, step: &StepKey) -> Result<bool, ArchiveError>;

    /// Record `step` only if it is absent. `Ok(false)` means another
    /// delivery recorded it first.
    async fn claim(&self, step: &StepKey) -> Result<bool, ArchiveError>;

    /// Undo a claim whose side effect did not happen.
    async fn release(&self, step: &StepKey) -> Result<(), ArchiveError>;
}
