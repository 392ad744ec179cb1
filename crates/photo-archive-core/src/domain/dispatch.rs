//! Dispatch decision: what the chain should do next for an envelope.
//!
//! This is the pure half of the dispatcher. The side effect (invoking the
//! feature target) lives in `app::dispatcher`.

use serde::{Deserialize, Serialize};

use super::envelope::JobEnvelope;
use super::feature::{FeatureName, FeatureState};

/// Next step of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every feature has completed.
    Done,

    /// Invoke this feature (first available and incomplete one in list order).
    Invoke { feature: FeatureState },

    /// Features remain but none of them can run.
    ///
    /// Distinct from `Done`: the chain halts here and nothing else will
    /// pick the job up again.
    Stalled { pending: Vec<FeatureName> },
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Done => "done",
            DispatchOutcome::Invoke { .. } => "invoke",
            DispatchOutcome::Stalled { .. } => "stalled",
        }
    }
}

/// Decide the next step. At most one feature is ever selected.
pub fn dispatch(envelope: &JobEnvelope) -> DispatchOutcome {
    if envelope.is_done() {
        return DispatchOutcome::Done;
    }

    if let Some(feature) = envelope.features().iter().find(|f| f.is_runnable()) {
        return DispatchOutcome::Invoke {
            feature: feature.clone(),
        };
    }

    let pending = envelope
        .features()
        .iter()
        .filter(|f| !f.completed)
        .map(|f| f.name.clone())
        .collect();
    DispatchOutcome::Stalled { pending }
}
