//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryParameterStore** / **InMemoryMessageQueue** /
//!   **InMemoryObjectStore** / **InMemoryMetricsStore** / **InMemoryStepLedger**
//! - **RecordingInvoker**: 呼び出しを記録して後で配送する FeatureInvoker
//! - **StaticLabelDetector**: 固定ラベルを返す画像認識
//!
//! 各実装は `set_offline` などの障害注入をサポートします。

pub mod inmem_metrics_store;
pub mod inmem_object_store;
pub mod inmem_parameter_store;
pub mod inmem_queue;
pub mod inmem_step_ledger;
pub mod recording_invoker;
pub mod static_labels;

pub use self::inmem_metrics_store::InMemoryMetricsStore;
pub use self::inmem_object_store::InMemoryObjectStore;
pub use self::inmem_parameter_store::InMemoryParameterStore;
pub use self::inmem_queue::InMemoryMessageQueue;
pub use self::inmem_step_ledger::InMemoryStepLedger;
pub use self::recording_invoker::{Invocation, RecordingInvoker};
pub use self::static_labels::StaticLabelDetector;
