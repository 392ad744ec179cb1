//! RecordingInvoker - 呼び出しを記録するだけの FeatureInvoker
//!
//! Invocations are queued in memory; `LocalPipeline` drains them and
//! routes each one to the registered feature handler.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::envelope::JobEnvelope;
use crate::domain::errors::ArchiveError;
use crate::domain::ids::InvocationId;
use crate::ports::{FeatureInvoker, IdGenerator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: InvocationId,
    pub target: String,
    pub envelope: JobEnvelope,
}

pub struct RecordingInvoker {
    ids: Arc<dyn IdGenerator>,
    pending: Mutex<VecDeque<Invocation>>,
    offline: AtomicBool,
}

impl RecordingInvoker {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            pending: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn next(&self) -> Option<Invocation> {
        self.pending.lock().await.pop_front()
    }

    pub async fn pending(&self) -> Vec<Invocation> {
        self.pending.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl FeatureInvoker for RecordingInvoker {
    async fn invoke(&self, target: &str, envelope: &JobEnvelope) -> Result<InvocationId, ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::upstream("invoker", format!("{target} unreachable")));
        }
        let id = self.ids.generate_invocation_id();
        self.pending.lock().await.push_back(Invocation {
            id,
            target: target.to_string(),
            envelope: envelope.clone(),
        });
        Ok(id)
    }
}
