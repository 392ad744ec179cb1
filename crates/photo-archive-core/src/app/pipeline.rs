//! LocalPipeline - 全コンポーネントを in-memory ports で配線したもの
//!
//! Used by the CLI `simulate` command and by end-to-end tests. Each pump
//! round drains, in order: the request queue (dispatcher), recorded
//! invocations (feature runners), and the metrics queue (sink). The loop
//! stops when a round moves nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::envelope::JobEnvelope;
use crate::domain::errors::ArchiveError;
use crate::domain::feature::FeatureName;
use crate::domain::metrics::MetricsRecord;
use crate::domain::tags::TagSet;
use crate::features::{ExifStrategy, HashStrategy, RekognitionStrategy};
use crate::impls::{
    InMemoryMessageQueue, InMemoryMetricsStore, InMemoryObjectStore, InMemoryParameterStore,
    InMemoryStepLedger, RecordingInvoker,
};
use crate::ports::{Clock, IdGenerator, LabelDetector, UlidGenerator};

use super::builder::{AppBuilder, BuildError};
use super::dispatcher::Dispatcher;
use super::handlers::HandlerRegistry;
use super::metrics_sink::MetricsSink;
use super::registry::FeatureRegistry;
use super::runner::{FeatureRunner, RunStatus, RunnerPorts};
use super::status::{DispatchCounts, JobProgress};
use super::trigger::TriggerAdapter;

/// Feature names of the standard pipeline, in job order.
pub const STANDARD_FEATURES: [&str; 3] = ["hash", "meta", "rekog"];

pub fn local_target(feature: &str) -> String {
    format!("local:{feature}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub job: String,
    pub feature: FeatureName,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Latest observed progress per job (keyed by job label).
    pub jobs: BTreeMap<String, JobProgress>,
    pub runs: Vec<RunRecord>,
    pub metrics_written: usize,
    pub dispatch: DispatchCounts,
}

pub struct LocalPipeline {
    config: PipelineConfig,
    pub params: Arc<InMemoryParameterStore>,
    pub objects: Arc<InMemoryObjectStore>,
    pub queue: Arc<InMemoryMessageQueue>,
    pub metrics: Arc<InMemoryMetricsStore>,
    pub invoker: Arc<RecordingInvoker>,
    /// Source of object-created event sequencers.
    uploads: AtomicU64,
    trigger: TriggerAdapter,
    dispatcher: Dispatcher,
    handlers: Arc<HandlerRegistry>,
    sink: MetricsSink,
}

impl LocalPipeline {
    /// Pipeline with hash / meta / rekog registered and enabled.
    pub fn standard(
        config: PipelineConfig,
        detector: Arc<dyn LabelDetector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BuildError> {
        let prefix = config.settings_prefix.clone();
        let params = Arc::new(InMemoryParameterStore::new());
        params.put(format!("/{prefix}/features"), STANDARD_FEATURES.join(","));
        for feature in STANDARD_FEATURES {
            params.put(format!("/{prefix}/features/{feature}/enabled"), "TRUE");
            params.put(format!("/{prefix}/features/{feature}/lambda/arn"), local_target(feature));
        }

        let objects = Arc::new(InMemoryObjectStore::new());
        let queue = Arc::new(InMemoryMessageQueue::new());
        let metrics = Arc::new(InMemoryMetricsStore::new());
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let invoker = Arc::new(RecordingInvoker::new(ids.clone()));
        let registry = Arc::new(FeatureRegistry::new(params.clone(), prefix));
        let ledger = Arc::new(InMemoryStepLedger::new());

        let ports = RunnerPorts {
            registry: registry.clone(),
            objects: objects.clone(),
            queue: queue.clone(),
            ledger: ledger.clone(),
            request_queue_url: config.request_queue_url.clone(),
            metrics_queue_url: config.metrics_queue_url.clone(),
        };
        let [hash, meta, rekog] = STANDARD_FEATURES;
        let targets: Vec<String> = STANDARD_FEATURES.iter().map(|f| local_target(f)).collect();
        let expected: Vec<&str> = targets.iter().map(String::as_str).collect();

        let app = AppBuilder::new()
            .register(local_target(hash), Arc::new(FeatureRunner::new(hash, HashStrategy, ports.clone())))?
            .register(local_target(meta), Arc::new(FeatureRunner::new(meta, ExifStrategy, ports.clone())))?
            .register(
                local_target(rekog),
                Arc::new(FeatureRunner::new(
                    rekog,
                    RekognitionStrategy::new(detector, config.rekognition.clone()),
                    ports,
                )),
            )?
            .expect_targets(&expected)
            .build()?;

        Ok(Self {
            trigger: TriggerAdapter::new(
                registry,
                queue.clone(),
                ledger,
                ids,
                config.request_queue_url.clone(),
            ),
            dispatcher: Dispatcher::new(invoker.clone()),
            handlers: app.handlers,
            sink: MetricsSink::new(metrics.clone(), clock, config.metrics_retry.policy()),
            config,
            params,
            objects,
            queue,
            metrics,
            invoker,
            uploads: AtomicU64::new(0),
        })
    }

    /// Switch a feature off in the registry. Jobs started afterwards list it
    /// as unavailable; jobs already running skip its work.
    pub fn disable(&self, feature: &str) {
        self.params.put(
            format!("/{}/features/{feature}/enabled", self.config.settings_prefix),
            "FALSE",
        );
    }

    /// Store an object and deliver its object-created notification.
    pub async fn ingest(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<Vec<JobEnvelope>, ArchiveError> {
        self.objects.put_object(bucket, key, body).await;
        let sequencer = format!("{:016X}", self.uploads.fetch_add(1, Ordering::SeqCst) + 1);
        let notification = json!({
            "Records": [{
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": bucket, "arn": format!("arn:aws:s3:::{bucket}")},
                    "object": {"key": urlencoding::encode(key), "sequencer": sequencer}
                }
            }]
        });
        self.trigger.handle_message(&notification.to_string()).await
    }

    pub async fn run_until_idle(&self) -> Result<PipelineReport, ArchiveError> {
        let mut report = PipelineReport::default();
        loop {
            let mut moved = false;

            while let Some(body) = self.queue.try_receive(&self.config.request_queue_url).await {
                moved = true;
                let envelope = JobEnvelope::from_json(&body)?;
                self.dispatcher.dispatch(&envelope).await?;
                report.jobs.insert(envelope.label(), JobProgress::of(&envelope));
            }

            while let Some(invocation) = self.invoker.next().await {
                moved = true;
                let outcome = self
                    .handlers
                    .execute(&invocation.target, &invocation.envelope)
                    .await?;
                report.runs.push(RunRecord {
                    job: invocation.envelope.label(),
                    feature: outcome.feature,
                    status: outcome.status,
                });
            }

            if let Some(url) = &self.config.metrics_queue_url {
                while let Some(body) = self.queue.try_receive(url).await {
                    moved = true;
                    self.sink.handle_message(&body).await?;
                    report.metrics_written += 1;
                }
            }

            if !moved {
                break;
            }
        }
        report.dispatch = self.dispatcher.stats();
        info!(
            jobs = report.jobs.len(),
            runs = report.runs.len(),
            metrics = report.metrics_written,
            "pipeline idle"
        );
        Ok(report)
    }

    pub async fn tags_of(&self, bucket: &str, key: &str) -> Option<TagSet> {
        self.objects.tags_of(bucket, key).await
    }

    pub async fn metrics_records(&self) -> Vec<MetricsRecord> {
        self.metrics.records().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::status::JobState;
    use crate::domain::metrics::MetricsKey;
    use crate::impls::StaticLabelDetector;
    use crate::ports::{FixedClock, Label};
    use chrono::{TimeZone, Utc};

    fn pipeline(metrics: bool) -> LocalPipeline {
        let config = PipelineConfig {
            metrics_queue_url: metrics.then(|| "metrics".to_string()),
            ..Default::default()
        };
        let detector = StaticLabelDetector::new(vec![
            Label {
                name: "Dog".into(),
                confidence: 97.5,
            },
            Label {
                name: "Beach".into(),
                confidence: 88.0,
            },
        ]);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        LocalPipeline::standard(config, Arc::new(detector), Arc::new(clock)).unwrap()
    }

    fn statuses(report: &PipelineReport) -> Vec<(String, RunStatus)> {
        report
            .runs
            .iter()
            .map(|r| (r.feature.to_string(), r.status))
            .collect()
    }

    #[tokio::test]
    async fn photo_runs_every_feature_in_order() {
        let p = pipeline(true);
        let jobs = p.ingest("photos", "2024/beach day.jpg", b"jpeg bytes".to_vec()).await.unwrap();
        assert_eq!(jobs.len(), 1);

        let report = p.run_until_idle().await.unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                ("hash".to_string(), RunStatus::Applied),
                ("meta".to_string(), RunStatus::Applied),
                ("rekog".to_string(), RunStatus::Applied),
            ]
        );
        let progress = &report.jobs[&jobs[0].label()];
        assert_eq!(progress.state, JobState::Done);
        assert_eq!(progress.completed, 3);
        assert_eq!(report.dispatch, DispatchCounts { done: 1, invoked: 3, stalled: 0 });

        let tags = p.tags_of("photos", "2024/beach day.jpg").await.unwrap();
        assert_eq!(tags.len(), 8);
        assert_eq!(tags.get("DetectedInPhoto"), Some("Dog,Beach"));
        assert_eq!(tags.get("Photo Date"), Some("Unknown"));

        let records = p.metrics_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hash, MetricsKey::for_object("photos", "2024/beach day.jpg"));
        assert_eq!(records[0].features_applied.len(), 3);
        assert_eq!(report.metrics_written, 3);
    }

    #[tokio::test]
    async fn non_photo_is_hashed_only() {
        let p = pipeline(true);
        p.ingest("photos", "notes.txt", b"hello".to_vec()).await.unwrap();
        let report = p.run_until_idle().await.unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                ("hash".to_string(), RunStatus::Applied),
                ("meta".to_string(), RunStatus::NotApplicable),
                ("rekog".to_string(), RunStatus::NotApplicable),
            ]
        );
        let tags = p.tags_of("photos", "notes.txt").await.unwrap();
        assert_eq!(tags.len(), 4);
        assert_eq!(report.dispatch.done, 1);

        let records = p.metrics_records().await;
        assert_eq!(records[0].features_applied.iter().collect::<Vec<_>>(), vec!["hash"]);
    }

    #[tokio::test]
    async fn feature_disabled_before_ingest_is_skipped() {
        let p = pipeline(false);
        p.disable("meta");
        p.ingest("photos", "a.png", b"png".to_vec()).await.unwrap();

        let report = p.run_until_idle().await.unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                ("hash".to_string(), RunStatus::Applied),
                ("rekog".to_string(), RunStatus::Applied),
            ]
        );
        // meta は unavailable のまま残る → 全 feature 完了にはならない
        assert_eq!(report.dispatch.stalled, 1);
        assert_eq!(report.dispatch.done, 0);
        assert!(p.tags_of("photos", "a.png").await.unwrap().get("Photo Date").is_none());
        assert!(p.metrics_records().await.is_empty());
    }

    #[tokio::test]
    async fn trailing_disabled_feature_stalls_job() {
        let p = pipeline(false);
        p.disable("rekog");
        let jobs = p.ingest("photos", "a.jpg", b"jpg".to_vec()).await.unwrap();

        let report = p.run_until_idle().await.unwrap();

        let progress = &report.jobs[&jobs[0].label()];
        assert_eq!(progress.state, JobState::Stalled);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.pending, vec![FeatureName::new("rekog")]);
    }

    #[tokio::test]
    async fn redelivered_invocation_does_not_run_next_feature_twice() {
        let p = pipeline(false);
        p.ingest("photos", "a.jpg", b"jpg".to_vec()).await.unwrap();

        let body = p.queue.try_receive(&p.config.request_queue_url).await.unwrap();
        p.dispatcher.dispatch(&JobEnvelope::from_json(&body).unwrap()).await.unwrap();
        let invocation = p.invoker.next().await.unwrap();
        for _ in 0..2 {
            p.handlers
                .execute(&invocation.target, &invocation.envelope)
                .await
                .unwrap();
        }
        assert_eq!(p.queue.len(&p.config.request_queue_url).await, 1);

        let report = p.run_until_idle().await.unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                ("meta".to_string(), RunStatus::Applied),
                ("rekog".to_string(), RunStatus::Applied),
            ]
        );
        assert_eq!(report.dispatch, DispatchCounts { done: 1, invoked: 3, stalled: 0 });
    }

    #[tokio::test]
    async fn same_key_uploaded_twice_runs_twice() {
        let p = pipeline(false);
        p.ingest("photos", "a.jpg", b"v1".to_vec()).await.unwrap();
        p.ingest("photos", "a.jpg", b"v2".to_vec()).await.unwrap();

        let report = p.run_until_idle().await.unwrap();

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.runs.len(), 6);
    }

    #[tokio::test]
    async fn invoker_outage_surfaces() {
        let p = pipeline(false);
        p.ingest("photos", "a.jpg", b"jpg".to_vec()).await.unwrap();
        p.invoker.set_offline(true);

        let err = p.run_until_idle().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(p.tags_of("photos", "a.jpg").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn several_objects_run_independently() {
        let p = pipeline(true);
        for key in ["a.jpg", "b.jpeg", "c.bin"] {
            p.ingest("photos", key, key.as_bytes().to_vec()).await.unwrap();
        }
        let report = p.run_until_idle().await.unwrap();

        assert_eq!(report.jobs.len(), 3);
        assert!(report.jobs.values().all(|j| j.state == JobState::Done));
        assert_eq!(report.runs.len(), 9);
        assert_eq!(p.metrics_records().await.len(), 3);
    }
}
