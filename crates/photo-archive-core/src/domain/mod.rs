//! Domain model: the job envelope and everything that can be decided
//! without talking to a cloud service.
//!
//! - envelope / feature / processor / dispatch: the feature chain
//! - metrics: per-object metrics record
//! - tags: object tag sets
//! - notification / custom_resource: bucket notification wiring
//! - s3_event: storage notifications that start a job
//! - step: keys of side effects that happen at most once

pub mod custom_resource;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod feature;
pub mod ids;
pub mod metrics;
pub mod notification;
pub mod processor;
pub mod s3_event;
pub mod step;
pub mod tags;

pub use self::custom_resource::{CustomResourceRequest, CustomResourceResponse, LinkProperties, ResponseStatus};
pub use self::dispatch::{DispatchOutcome, dispatch};
pub use self::envelope::{JobEnvelope, ObjectLocator};
pub use self::errors::{ArchiveError, ErrorKind};
pub use self::feature::{FeatureDefinition, FeatureName, FeatureState};
pub use self::ids::{InvocationId, JobId};
pub use self::metrics::{MetricsEvent, MetricsKey, MetricsRecord};
pub use self::notification::{NotificationConfiguration, NotificationLink, TargetKind};
pub use self::processor::advance;
pub use self::s3_event::{CreatedObject, StorageNotification};
pub use self::step::StepKey;
pub use self::tags::{Tag, TagSet};
