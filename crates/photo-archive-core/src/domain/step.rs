//! Step keys: pipeline side effects that must happen at most once even when
//! the transport redelivers the message that causes them.

use std::fmt;

use super::envelope::ObjectLocator;
use super::ids::JobId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey(String);

impl StepKey {
    /// A job was started for one object-created event. `sequencer` orders
    /// events on the same key, so a re-upload gets a new step.
    pub fn job_started(object: &ObjectLocator, sequencer: &str) -> Self {
        Self(format!(
            "start/{}/{}@{sequencer}",
            object.bucket_name, object.key
        ))
    }

    /// `feature` of `job` finished and its envelope went back to the
    /// request queue.
    pub fn feature_forwarded(job: JobId, feature: &str) -> Self {
        Self(format!("forward/{job}/{feature}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn reupload_is_a_different_step() {
        let object = ObjectLocator::new("photos", "arn", "a.jpg");
        assert_ne!(
            StepKey::job_started(&object, "0055AED6DCD90281E5"),
            StepKey::job_started(&object, "0055AED6DCD90281E6")
        );
    }

    #[test]
    fn forward_key_names_job_and_feature() {
        let job = JobId::from_ulid(Ulid::nil());
        assert_eq!(
            StepKey::feature_forwarded(job, "hash").as_str(),
            format!("forward/job-{}/hash", Ulid::nil())
        );
    }
}
