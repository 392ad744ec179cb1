//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部サービス（object storage, queue, parameter store,
//! function invocation, key-value store, image recognition）への
//! インターフェースです。クライアントはプロセス起動時に一度だけ構築し、
//! 各コンポーネントのコンストラクタに渡します。

pub mod clock;
pub mod id_generator;
pub mod invoker;
pub mod label_detector;
pub mod message_queue;
pub mod metrics_store;
pub mod object_store;
pub mod parameter_store;
pub mod step_ledger;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::invoker::FeatureInvoker;
pub use self::label_detector::{Label, LabelDetector};
pub use self::message_queue::MessageQueue;
pub use self::metrics_store::MetricsStore;
pub use self::object_store::{ObjectStore, VersionedTags};
pub use self::parameter_store::ParameterStore;
pub use self::step_ledger::StepLedger;
