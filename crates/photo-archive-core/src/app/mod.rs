//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてパイプラインの各ステージを実装します。
//!
//! # 主要コンポーネント
//! - **FeatureRegistry**: parameter store 上の feature 設定
//! - **TriggerAdapter**: object-created 通知 → 新しい job
//! - **Dispatcher**: request queue → 次の feature の起動
//! - **FeatureRunner**: feature 共通の実行手順（tag 更新・metrics・advance）
//! - **MetricsSink**: metrics queue → オブジェクトごとの record
//! - **NotificationReconciler**: bucket 通知設定の custom resource
//! - **AppBuilder** / **LocalPipeline**: 配線と起動時検証

pub mod builder;
pub mod dispatcher;
pub mod handlers;
pub mod metrics_sink;
pub mod pipeline;
pub mod reconciler;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod status;
pub mod trigger;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatcher::Dispatcher;
pub use self::handlers::{FeatureHandler, HandlerRegistry, RegistryError};
pub use self::metrics_sink::MetricsSink;
pub use self::pipeline::{LocalPipeline, PipelineReport, RunRecord};
pub use self::reconciler::NotificationReconciler;
pub use self::registry::FeatureRegistry;
pub use self::retry::RetryPolicy;
pub use self::runner::{
    FeatureContext, FeatureResult, FeatureRunOutcome, FeatureRunner, FeatureStrategy, RunStatus,
    RunnerPorts,
};
pub use self::status::{DispatchCounts, DispatchStats, JobProgress, JobState};
pub use self::trigger::TriggerAdapter;
