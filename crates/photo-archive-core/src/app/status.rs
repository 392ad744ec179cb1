//! Status - ジョブ進捗と dispatch 集計
//!
//! Stalled jobs are never repaired automatically; they are only made
//! visible here (and in the dispatcher's warn log).

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::dispatch::{DispatchOutcome, dispatch};
use crate::domain::envelope::JobEnvelope;
use crate::domain::feature::FeatureName;
use crate::domain::ids::JobId;

/// Snapshot of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub done: usize,
    pub invoked: usize,
    pub stalled: usize,
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    done: AtomicUsize,
    invoked: AtomicUsize,
    stalled: AtomicUsize,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Done => &self.done,
            DispatchOutcome::Invoke { .. } => &self.invoked,
            DispatchOutcome::Stalled { .. } => &self.stalled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            done: self.done.load(Ordering::Relaxed),
            invoked: self.invoked.load(Ordering::Relaxed),
            stalled: self.stalled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Done,
    Stalled,
}

/// Human-facing summary of one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub bucket: String,
    pub key: String,
    pub completed: usize,
    pub total: usize,
    pub state: JobState,
    /// Feature that will be invoked next, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<FeatureName>,
    pub pending: Vec<FeatureName>,
}

impl JobProgress {
    pub fn of(envelope: &JobEnvelope) -> Self {
        let (state, next) = match dispatch(envelope) {
            DispatchOutcome::Done => (JobState::Done, None),
            DispatchOutcome::Invoke { feature } => (JobState::Running, Some(feature.name)),
            DispatchOutcome::Stalled { .. } => (JobState::Stalled, None),
        };
        Self {
            job_id: envelope.job_id(),
            bucket: envelope.object().bucket_name.clone(),
            key: envelope.object().key.clone(),
            completed: envelope.completed_count(),
            total: envelope.features().len(),
            state,
            next,
            pending: envelope
                .features()
                .iter()
                .filter(|f| !f.completed)
                .map(|f| f.name.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::ObjectLocator;
    use crate::domain::feature::FeatureState;
    use crate::domain::processor::advance;
    use rstest::rstest;

    fn envelope(features: Vec<FeatureState>) -> JobEnvelope {
        JobEnvelope::new(None, ObjectLocator::new("photos", "arn", "a.jpg"), features, 0).unwrap()
    }

    #[rstest]
    #[case::running(vec![FeatureState::available("hash", "arn:hash")], JobState::Running)]
    #[case::stalled(vec![FeatureState::unavailable("meta")], JobState::Stalled)]
    #[case::empty(vec![], JobState::Done)]
    fn progress_state(#[case] features: Vec<FeatureState>, #[case] state: JobState) {
        assert_eq!(JobProgress::of(&envelope(features)).state, state);
    }

    #[test]
    fn progress_counts_and_next() {
        let e = envelope(vec![
            FeatureState::available("hash", "arn:hash"),
            FeatureState::available("meta", "arn:meta"),
        ]);
        let e = advance(&e, "hash").unwrap();
        let progress = JobProgress::of(&e);

        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.next, Some(FeatureName::new("meta")));
        assert_eq!(progress.pending, vec![FeatureName::new("meta")]);
    }

    #[test]
    fn stats_count_each_outcome() {
        let stats = DispatchStats::new();
        stats.record(&DispatchOutcome::Done);
        stats.record(&DispatchOutcome::Stalled { pending: vec![] });
        stats.record(&DispatchOutcome::Stalled { pending: vec![] });

        assert_eq!(
            stats.snapshot(),
            DispatchCounts {
                done: 1,
                invoked: 0,
                stalled: 2
            }
        );
    }
}
