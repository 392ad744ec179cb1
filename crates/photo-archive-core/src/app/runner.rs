//! FeatureRunner - すべての enrichment feature に共通の実行手順
//!
//! A feature only supplies a [`FeatureStrategy`] (what to compute and which
//! tag keys it owns). The runner does the rest:
//!
//! 1. look the feature up in the envelope (`UnknownFeature` otherwise)
//! 2. already completed, or already forwarded by an earlier delivery of the
//!    same invocation: no-op, nothing is forwarded
//! 3. disabled in the registry: advance without work
//! 4. run the strategy, write its tags, publish metrics
//! 5. claim the forward step in the ledger, advance and put the envelope
//!    back on the request queue
//!
//! Any upstream error aborts before step 5, so the job is never advanced
//! past a feature whose work did not happen. The claim in step 5 keeps the
//! next feature from being invoked twice when an invocation is redelivered;
//! steps 3 and 4 are safe to repeat (tags replace owned keys, metrics merge).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::envelope::{JobEnvelope, ObjectLocator};
use crate::domain::errors::ArchiveError;
use crate::domain::feature::FeatureName;
use crate::domain::metrics::MetricsEvent;
use crate::domain::processor::advance;
use crate::domain::step::StepKey;
use crate::domain::tags::Tag;
use crate::ports::{MessageQueue, ObjectStore, StepLedger};

use super::handlers::FeatureHandler;
use super::registry::FeatureRegistry;

/// What a strategy gets to look at.
pub struct FeatureContext<'a> {
    pub object: &'a ObjectLocator,
    pub store: &'a dyn ObjectStore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureResult {
    /// Tags to write (replacing the strategy's own keys) and the payload
    /// for the metrics record.
    Applied {
        tags: Vec<Tag>,
        data: serde_json::Value,
    },
    /// The object is not something this feature handles (e.g. not a photo).
    NotApplicable { reason: String },
}

#[async_trait]
pub trait FeatureStrategy: Send + Sync {
    /// Tag keys this feature owns. Only these are replaced on write.
    fn tag_keys(&self) -> &[&'static str];

    async fn apply(&self, ctx: FeatureContext<'_>) -> Result<FeatureResult, ArchiveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Applied,
    NotApplicable,
    Disabled,
    AlreadyCompleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRunOutcome {
    pub feature: FeatureName,
    pub status: RunStatus,
    /// Envelope sent back to the request queue, `None` when nothing was sent.
    pub forwarded: Option<JobEnvelope>,
}

/// Ports shared by every runner of a pipeline.
#[derive(Clone)]
pub struct RunnerPorts {
    pub registry: Arc<FeatureRegistry>,
    pub objects: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn MessageQueue>,
    /// Records which (job, feature) envelopes were already forwarded.
    pub ledger: Arc<dyn StepLedger>,
    pub request_queue_url: String,
    /// Metrics are published only when set.
    pub metrics_queue_url: Option<String>,
}

pub struct FeatureRunner<S> {
    feature: FeatureName,
    strategy: S,
    ports: RunnerPorts,
}

impl<S: FeatureStrategy> FeatureRunner<S> {
    pub fn new(feature: impl Into<String>, strategy: S, ports: RunnerPorts) -> Self {
        Self {
            feature: FeatureName::new(feature),
            strategy,
            ports,
        }
    }

    #[tracing::instrument(skip_all, fields(job = %envelope.label(), feature = %self.feature))]
    pub async fn run(&self, envelope: &JobEnvelope) -> Result<FeatureRunOutcome, ArchiveError> {
        let name = self.feature.as_str();
        let state = envelope
            .feature(name)
            .ok_or_else(|| ArchiveError::UnknownFeature(name.to_string()))?;

        if state.completed {
            debug!("feature already completed, ignoring redelivery");
            return Ok(self.outcome(RunStatus::AlreadyCompleted, None));
        }

        let step = envelope
            .job_id()
            .map(|job| StepKey::feature_forwarded(job, name));
        if let Some(step) = &step {
            if self.ports.ledger.contains(step).await? {
                debug!(%step, "envelope already forwarded, ignoring redelivery");
                return Ok(self.outcome(RunStatus::AlreadyCompleted, None));
            }
        }

        if !self.ports.registry.is_enabled(name).await? {
            info!("feature disabled, advancing without work");
            return self.finish(envelope, step.as_ref(), RunStatus::Disabled).await;
        }

        let object = envelope.object();
        let result = self
            .strategy
            .apply(FeatureContext {
                object,
                store: self.ports.objects.as_ref(),
            })
            .await?;

        let status = match result {
            FeatureResult::Applied { tags, data } => {
                self.write_tags(object, tags).await?;
                self.publish_metrics(object, data).await?;
                RunStatus::Applied
            }
            FeatureResult::NotApplicable { reason } => {
                info!(%reason, "feature not applicable");
                RunStatus::NotApplicable
            }
        };

        self.finish(envelope, step.as_ref(), status).await
    }

    /// Forward unless a concurrent delivery claimed the step first.
    async fn finish(
        &self,
        envelope: &JobEnvelope,
        step: Option<&StepKey>,
        status: RunStatus,
    ) -> Result<FeatureRunOutcome, ArchiveError> {
        if let Some(step) = step {
            if !self.ports.ledger.claim(step).await? {
                info!(%step, "envelope forwarded by a concurrent delivery");
                return Ok(self.outcome(RunStatus::AlreadyCompleted, None));
            }
        }

        match self.forward(envelope).await {
            Ok(next) => Ok(self.outcome(status, Some(next))),
            Err(err) => {
                if let Some(step) = step {
                    if let Err(release) = self.ports.ledger.release(step).await {
                        warn!(%step, error = %release, "could not release forward claim");
                    }
                }
                Err(err)
            }
        }
    }

    /// Single read-modify-write; a concurrent tag change fails the run.
    async fn write_tags(&self, object: &ObjectLocator, tags: Vec<Tag>) -> Result<(), ArchiveError> {
        let current = self.ports.objects.get_tags(object).await?;
        let next = current.tags.replace_keys(self.strategy.tag_keys(), tags)?;
        debug!(tags = next.len(), version = current.version, "writing tags");
        self.ports
            .objects
            .put_tags(object, next, current.version)
            .await
    }

    async fn publish_metrics(&self, object: &ObjectLocator, data: serde_json::Value) -> Result<(), ArchiveError> {
        let Some(url) = &self.ports.metrics_queue_url else {
            return Ok(());
        };
        let event = MetricsEvent::new(object, self.feature.as_str(), data);
        self.ports
            .queue
            .send(url, serde_json::to_string(&event)?)
            .await
    }

    async fn forward(&self, envelope: &JobEnvelope) -> Result<JobEnvelope, ArchiveError> {
        let next = advance(envelope, self.feature.as_str())?;
        self.ports
            .queue
            .send(&self.ports.request_queue_url, next.to_json()?)
            .await?;
        debug!(completed = next.completed_count(), "envelope forwarded");
        Ok(next)
    }

    fn outcome(&self, status: RunStatus, forwarded: Option<JobEnvelope>) -> FeatureRunOutcome {
        FeatureRunOutcome {
            feature: self.feature.clone(),
            status,
            forwarded,
        }
    }
}

#[async_trait]
impl<S: FeatureStrategy> FeatureHandler for FeatureRunner<S> {
    fn feature(&self) -> &FeatureName {
        &self.feature
    }

    async fn handle(&self, envelope: &JobEnvelope) -> Result<FeatureRunOutcome, ArchiveError> {
        self.run(envelope).await
    }
}
