//! Dispatcher - request queue のコンシューマ
//!
//! Decides the next step of each envelope and invokes at most one feature.
//! The invocation carries the pre-advance envelope: the feature itself
//! advances and re-queues it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::dispatch::{DispatchOutcome, dispatch};
use crate::domain::envelope::JobEnvelope;
use crate::domain::errors::ArchiveError;
use crate::ports::FeatureInvoker;

use super::status::{DispatchCounts, DispatchStats};

pub struct Dispatcher {
    invoker: Arc<dyn FeatureInvoker>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(invoker: Arc<dyn FeatureInvoker>) -> Self {
        Self {
            invoker,
            stats: DispatchStats::new(),
        }
    }

    pub fn stats(&self) -> DispatchCounts {
        self.stats.snapshot()
    }

    #[tracing::instrument(skip_all, fields(job = %envelope.label()))]
    pub async fn dispatch(&self, envelope: &JobEnvelope) -> Result<DispatchOutcome, ArchiveError> {
        let outcome = dispatch(envelope);
        match &outcome {
            DispatchOutcome::Done => {
                info!(
                    completed = envelope.completed_count(),
                    "all features completed"
                );
            }
            DispatchOutcome::Invoke { feature } => {
                // available な feature は必ず target を持つ（envelope の不変条件）
                let target = feature.target().ok_or_else(|| {
                    ArchiveError::InvalidEnvelope(format!("feature '{}' has no target", feature.name))
                })?;
                let invocation = self.invoker.invoke(target, envelope).await?;
                info!(feature = %feature.name, %target, %invocation, "feature invoked");
            }
            DispatchOutcome::Stalled { pending } => {
                let pending: Vec<&str> = pending.iter().map(|n| n.as_str()).collect();
                warn!(
                    completed = envelope.completed_count(),
                    total = envelope.features().len(),
                    ?pending,
                    "job stalled: remaining features are unavailable"
                );
            }
        }
        self.stats.record(&outcome);
        Ok(outcome)
    }

    /// Decode and dispatch one request queue message.
    pub async fn handle_message(&self, body: &str) -> Result<DispatchOutcome, ArchiveError> {
        let envelope = JobEnvelope::from_json(body)?;
        self.dispatch(&envelope).await
    }

    /// Process a batch in order, stopping at the first failure.
    ///
    /// The error fails the whole batch, so the transport redelivers every
    /// message in it, including those already dispatched. Their repeated
    /// invocations reach a runner whose forward step is already claimed
    /// and end as `AlreadyCompleted`.
    pub async fn handle_batch<I, S>(&self, bodies: I) -> Result<Vec<DispatchOutcome>, ArchiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcomes = Vec::new();
        for body in bodies {
            outcomes.push(self.handle_message(body.as_ref()).await?);
        }
        debug!(count = outcomes.len(), "batch dispatched");
        Ok(outcomes)
    }
}
