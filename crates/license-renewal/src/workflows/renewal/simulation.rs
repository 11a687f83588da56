//! Local stand-ins for the payment gateway and the document and transit-department checks.
//!
//! Each call waits a fixed delay and then writes its outcome through the [`WorkflowStore`].

use std::time::Duration;

use tracing::info;

use super::domain::{ProcessId, VerificationStep};
use super::storage::KeyValueStore;
use super::store::{Clock, StoreError, WorkflowStore};
use crate::config::SimulationConfig;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("payment amount must be a positive number, got {0}")]
    InvalidAmount(f64),
    #[error("process {0} not found")]
    ProcessNotFound(ProcessId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct PaymentSimulator {
    delay: Duration,
}

impl PaymentSimulator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.payment_delay)
    }

    /// Charges `amount` and submits the current draft as a new process.
    pub async fn pay<S, C>(
        &self,
        store: &WorkflowStore<S, C>,
        amount: f64,
    ) -> Result<ProcessId, SimulationError>
    where
        S: KeyValueStore,
        C: Clock,
    {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(SimulationError::InvalidAmount(amount));
        }

        tokio::time::sleep(self.delay).await;
        let id = store.add_completed_process(amount).await?;
        info!(process_id = %id, amount, "simulated payment accepted");
        Ok(id)
    }
}

#[derive(Debug, Clone)]
pub struct VerificationSimulator {
    delay: Duration,
}

impl VerificationSimulator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.verification_delay)
    }

    pub async fn verify_documents<S, C>(
        &self,
        store: &WorkflowStore<S, C>,
        id: &ProcessId,
    ) -> Result<(), SimulationError>
    where
        S: KeyValueStore,
        C: Clock,
    {
        self.approve(store, id, VerificationStep::DocumentVerification)
            .await
    }

    pub async fn verify_transit<S, C>(
        &self,
        store: &WorkflowStore<S, C>,
        id: &ProcessId,
    ) -> Result<(), SimulationError>
    where
        S: KeyValueStore,
        C: Clock,
    {
        self.approve(store, id, VerificationStep::TransitVerification)
            .await
    }

    /// Moves a process one status forward. The store itself accepts any transition.
    pub async fn advance_status<S, C>(
        &self,
        store: &WorkflowStore<S, C>,
        id: &ProcessId,
    ) -> Result<(), SimulationError>
    where
        S: KeyValueStore,
        C: Clock,
    {
        let process = store
            .completed_process(id)
            .ok_or_else(|| SimulationError::ProcessNotFound(id.clone()))?;
        let next = process.status.next();
        store.update_completed_process_status(id, next).await;
        info!(process_id = %id, status = next.label(), "process status advanced");
        Ok(())
    }

    async fn approve<S, C>(
        &self,
        store: &WorkflowStore<S, C>,
        id: &ProcessId,
        step: VerificationStep,
    ) -> Result<(), SimulationError>
    where
        S: KeyValueStore,
        C: Clock,
    {
        tokio::time::sleep(self.delay).await;
        store
            .update_process_verification_step(id, step, true)
            .await
            .ok_or_else(|| SimulationError::ProcessNotFound(id.clone()))?;
        info!(process_id = %id, step = step.label(), "simulated verification passed");
        Ok(())
    }
}
