//! Submission lifecycle state machine
//!
//! ```text
//! Idle ──begin──▶ Pending ──succeed──▶ Success ──reset──▶ Idle
//!                    │ ▲
//!                    │ └─ set_phase
//!                    └──fail──▶ Error ──reset──▶ Idle
//! ```
//!
//! The state is owned by the caller. Core operations borrow it mutably for
//! the duration of one submission and never keep it.

use serde::Serialize;
use solana_sdk::signature::Signature;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("a submission is already pending")]
    AlreadyPending,

    #[error("no submission is pending (status: {0:?})")]
    NotPending(TxStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionLifecycle {
    status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl TransactionLifecycle {
    pub fn new() -> Self {
        Self {
            status: TxStatus::Idle,
            signature: None,
            message: None,
        }
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }

    /// Enter `Pending`. A previous success or error is discarded.
    pub fn begin(&mut self, phase: impl Into<String>) -> Result<(), LifecycleError> {
        if self.is_pending() {
            return Err(LifecycleError::AlreadyPending);
        }
        self.status = TxStatus::Pending;
        self.signature = None;
        self.message = Some(phase.into());
        Ok(())
    }

    /// Replace the phase message without leaving `Pending`
    pub fn set_phase(&mut self, phase: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_pending()?;
        self.message = Some(phase.into());
        Ok(())
    }

    pub fn succeed(
        &mut self,
        signature: &Signature,
        summary: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        self.ensure_pending()?;
        self.status = TxStatus::Success;
        self.signature = Some(signature.to_string());
        self.message = Some(summary.into());
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_pending()?;
        self.status = TxStatus::Error;
        self.signature = None;
        self.message = Some(message.into());
        Ok(())
    }

    /// Caller-initiated dismiss. Not allowed while a submission is pending.
    pub fn reset(&mut self) -> Result<(), LifecycleError> {
        if self.is_pending() {
            return Err(LifecycleError::AlreadyPending);
        }
        *self = Self::new();
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), LifecycleError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(LifecycleError::NotPending(self.status))
        }
    }
}

impl Default for TransactionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
