//! MessageQueue port - メッセージ送信（request queue / metrics queue）
//!
//! Queues are addressed by url; the body is an opaque JSON string.

use async_trait::async_trait;

use crate::domain::errors::ArchiveError;

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send(&self, queue_url: &str, body: String) -> Result<(), ArchiveError>;
}
