//! InMemoryMessageQueue - 開発用・テスト用のメッセージキュー
//!
//! # 実装詳細
//! - HashMap<String, VecDeque<String>> で queue url ごとにキューを管理
//! - tokio::sync::Mutex で排他制御
//! - 受信は try_receive のみ（LocalPipeline が空になるまで汲み出す）

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::ArchiveError;
use crate::ports::MessageQueue;

#[derive(Default)]
pub struct InMemoryMessageQueue {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    offline: AtomicBool,
    /// Sends still accepted before the queue goes offline by itself.
    sends_before_outage: StdMutex<Option<usize>>,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every `send` fails with `UpstreamUnavailable`.
    /// Also cancels a pending [`offline_after`](Self::offline_after).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        *self.sends_before_outage.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Accept `sends` more messages, then go offline.
    pub fn offline_after(&self, sends: usize) {
        *self.sends_before_outage.lock().unwrap_or_else(|e| e.into_inner()) = Some(sends);
    }

    /// Pop one message without waiting.
    pub async fn try_receive(&self, queue_url: &str) -> Option<String> {
        let mut queues = self.queues.lock().await;
        queues.get_mut(queue_url).and_then(|q| q.pop_front())
    }

    pub async fn len(&self, queue_url: &str) -> usize {
        let queues = self.queues.lock().await;
        queues.get(queue_url).map_or(0, VecDeque::len)
    }

    pub async fn is_empty(&self, queue_url: &str) -> bool {
        self.len(queue_url).await == 0
    }

    fn accepts_send(&self) -> bool {
        let mut budget = self.sends_before_outage.lock().unwrap_or_else(|e| e.into_inner());
        match budget.as_mut() {
            Some(0) => {
                *budget = None;
                self.offline.store(true, Ordering::SeqCst);
            }
            Some(n) => *n -= 1,
            None => {}
        }
        !self.offline.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn send(&self, queue_url: &str, body: String) -> Result<(), ArchiveError> {
        if !self.accepts_send() {
            return Err(ArchiveError::upstream("queue", format!("{queue_url} is offline")));
        }
        let mut queues = self.queues.lock().await;
        queues.entry(queue_url.to_string()).or_default().push_back(body);
        Ok(())
    }
}
