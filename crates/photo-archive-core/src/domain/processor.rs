//! Feature processor: the single state transition of a job.

use super::envelope::JobEnvelope;
use super::errors::ArchiveError;

/// Mark `feature_name` as completed and return the advanced envelope.
///
/// Pure function: the input is never touched. Fails with `UnknownFeature`
/// when the name is absent and with `FeatureAlreadyCompleted` when the
/// feature already ran, so `completedCount` can never drift from the flags.
pub fn advance(envelope: &JobEnvelope, feature_name: &str) -> Result<JobEnvelope, ArchiveError> {
    let index = envelope
        .features()
        .iter()
        .position(|f| f.name == *feature_name)
        .ok_or_else(|| ArchiveError::UnknownFeature(feature_name.to_string()))?;

    if envelope.features()[index].completed {
        return Err(ArchiveError::FeatureAlreadyCompleted(
            feature_name.to_string(),
        ));
    }

    let mut features = envelope.features().to_vec();
    features[index].completed = true;
    Ok(envelope.with_progress(features, envelope.completed_count() + 1))
}
