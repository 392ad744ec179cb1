//! photo-archive-core
//!
//! Feature chaining for a photo archive: every uploaded object becomes a job
//! whose envelope carries an ordered feature list through a request queue,
//! one feature at a time.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（envelope, processor, dispatch, metrics, tags, notification, errors）
//! - **ports**: 抽象化レイヤー（ObjectStore, MessageQueue, ParameterStore, FeatureInvoker, など）
//! - **impls**: 実装（in-memory の開発用・テスト用）
//! - **app**: アプリケーションロジック（registry, trigger, dispatcher, runner, metrics sink, reconciler）
//! - **features**: feature ごとの処理（hash, meta, rekognition）
//! - **config**: パイプライン設定

pub mod app;
pub mod config;
pub mod domain;
pub mod features;
pub mod impls;
pub mod ports;
