//! InMemoryStepLedger - 開発用の step ledger

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::ArchiveError;
use crate::domain::step::StepKey;
use crate::ports::StepLedger;

#[derive(Default)]
pub struct InMemoryStepLedger {
    steps: Mutex<HashSet<StepKey>>,
    offline: AtomicBool,
}

impl InMemoryStepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::upstream("step ledger", "offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl StepLedger for InMemoryStepLedger {
    async fn contains(&self, step: &StepKey) -> Result<bool, ArchiveError> {
        self.check_online()?;
        Ok(self.steps.lock().await.contains(step))
    }

    async fn claim(&self, step: &StepKey) -> Result<bool, ArchiveError> {
        self.check_online()?;
        Ok(self.steps.lock().await.insert(step.clone()))
    }

    async fn release(&self, step: &StepKey) -> Result<(), ArchiveError> {
        self.check_online()?;
        self.steps.lock().await.remove(step);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::ObjectLocator;

    fn step() -> StepKey {
        StepKey::job_started(&ObjectLocator::new("photos", "arn", "a.jpg"), "01")
    }

    #[tokio::test]
    async fn second_claim_loses() {
        let ledger = InMemoryStepLedger::new();
        assert!(ledger.claim(&step()).await.unwrap());
        assert!(!ledger.claim(&step()).await.unwrap());
        assert!(ledger.contains(&step()).await.unwrap());
    }

    #[tokio::test]
    async fn released_step_can_be_claimed_again() {
        let ledger = InMemoryStepLedger::new();
        ledger.claim(&step()).await.unwrap();
        ledger.release(&step()).await.unwrap();
        assert!(!ledger.contains(&step()).await.unwrap());
        assert!(ledger.claim(&step()).await.unwrap());
    }

    #[tokio::test]
    async fn offline_ledger_fails() {
        let ledger = InMemoryStepLedger::new();
        ledger.set_offline(true);
        let err = ledger.claim(&step()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
