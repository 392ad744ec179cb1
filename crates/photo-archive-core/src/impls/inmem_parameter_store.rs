//! InMemoryParameterStore - 開発用の設定値ストア

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::domain::errors::ArchiveError;
use crate::ports::ParameterStore;

#[derive(Default)]
pub struct InMemoryParameterStore {
    values: Mutex<HashMap<String, String>>,
    offline: AtomicBool,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters<I, K, V>(parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (k, v) in parameters {
            store.put(k, v);
        }
        store
    }

    pub fn put(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(name.into(), value.into());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<Option<String>, ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::upstream("parameter store", "offline"));
        }
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(name).cloned())
    }
}
