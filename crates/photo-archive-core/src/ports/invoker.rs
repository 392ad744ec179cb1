//! FeatureInvoker port - feature 実行先の非同期呼び出し
//!
//! Fire-and-forget: the returned id only acknowledges that the invocation
//! was accepted. The invoked feature reports progress by re-queuing the
//! advanced envelope itself.

use async_trait::async_trait;

use crate::domain::envelope::JobEnvelope;
use crate::domain::errors::ArchiveError;
use crate::domain::ids::InvocationId;

#[async_trait]
pub trait FeatureInvoker: Send + Sync {
    async fn invoke(&self, target: &str, envelope: &JobEnvelope) -> Result<InvocationId, ArchiveError>;
}
