//! TriggerAdapter - object-created 通知から job を開始する
//!
//! One envelope per created object. The feature list is read from the
//! registry at this point and never changes for the life of the job.
//!
//! Each start is claimed in the [`StepLedger`] under the event's sequencer,
//! so a redelivered notification (e.g. after a partial failure) does not
//! start the same object twice.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::envelope::JobEnvelope;
use crate::domain::errors::ArchiveError;
use crate::domain::feature::FeatureState;
use crate::domain::s3_event::{CreatedObject, StorageNotification};
use crate::domain::step::StepKey;
use crate::ports::{IdGenerator, MessageQueue, StepLedger};

use super::registry::FeatureRegistry;

pub struct TriggerAdapter {
    registry: Arc<FeatureRegistry>,
    queue: Arc<dyn MessageQueue>,
    ledger: Arc<dyn StepLedger>,
    ids: Arc<dyn IdGenerator>,
    request_queue_url: String,
}

impl TriggerAdapter {
    pub fn new(
        registry: Arc<FeatureRegistry>,
        queue: Arc<dyn MessageQueue>,
        ledger: Arc<dyn StepLedger>,
        ids: Arc<dyn IdGenerator>,
        request_queue_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            queue,
            ledger,
            ids,
            request_queue_url: request_queue_url.into(),
        }
    }

    /// Start one job per created object and enqueue it. Returns the jobs
    /// started by this delivery.
    #[tracing::instrument(skip_all)]
    pub async fn handle_message(&self, body: &str) -> Result<Vec<JobEnvelope>, ArchiveError> {
        let objects = match StorageNotification::parse(body)? {
            StorageNotification::TestEvent => {
                debug!("ignoring storage test event");
                return Ok(Vec::new());
            }
            StorageNotification::ObjectsCreated(objects) => objects,
        };

        // 1 通知につき registry は 1 回だけ読む
        let features: Vec<_> = self
            .registry
            .load()
            .await?
            .iter()
            .map(|definition| definition.to_state())
            .collect();

        let mut started = Vec::with_capacity(objects.len());
        for created in objects {
            if let Some(envelope) = self.start(created, features.clone()).await? {
                started.push(envelope);
            }
        }
        Ok(started)
    }

    async fn start(
        &self,
        created: CreatedObject,
        features: Vec<FeatureState>,
    ) -> Result<Option<JobEnvelope>, ArchiveError> {
        let step = created
            .sequencer
            .as_deref()
            .map(|seq| StepKey::job_started(&created.object, seq));
        if let Some(step) = &step {
            if !self.ledger.claim(step).await? {
                info!(%step, "object already started by an earlier delivery");
                return Ok(None);
            }
        }

        let sent = match JobEnvelope::new_job(self.ids.generate_job_id(), created.object, features) {
            Ok(envelope) => self.send(envelope).await,
            Err(err) => Err(err),
        };
        let envelope = match sent {
            Ok(envelope) => envelope,
            Err(err) => {
                if let Some(step) = &step {
                    if let Err(release) = self.ledger.release(step).await {
                        warn!(%step, error = %release, "could not release start claim");
                    }
                }
                return Err(err);
            }
        };

        info!(
            job = %envelope.label(),
            bucket = %envelope.object().bucket_name,
            key = %envelope.object().key,
            features = envelope.features().len(),
            "job started"
        );
        Ok(Some(envelope))
    }

    async fn send(&self, envelope: JobEnvelope) -> Result<JobEnvelope, ArchiveError> {
        self.queue
            .send(&self.request_queue_url, envelope.to_json()?)
            .await?;
        Ok(envelope)
    }
}
