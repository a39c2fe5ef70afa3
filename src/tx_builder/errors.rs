//! Error types for batch planning and submission
//!
//! Every failure that can abort an in-flight batch is expressed as a
//! [`BatchError`]. The lifecycle surfaces `to_string()` of these errors to the
//! user, so display strings are written to be read by a human.

use thiserror::Error;

/// Error type for all planning and submission operations
///
/// Covers the full path of a batch:
/// - Recipient decode and amount conversion while planning
/// - Mint resolution for token transfers
/// - Blockhash fetch, signing, broadcast and confirmation
#[derive(Error, Debug)]
pub enum BatchError {
    /// A recipient address failed structural decode during planning
    #[error("Invalid address for recipient {index}: {reason}")]
    InvalidAddress {
        /// Position of the recipient in the batch
        index: usize,
        /// Decode failure reason
        reason: String,
    },

    /// A recipient amount is not a positive decimal or overflows base units
    #[error("Invalid amount for recipient {index}: {reason}")]
    InvalidAmount {
        /// Position of the recipient in the batch
        index: usize,
        /// Parse failure reason
        reason: String,
    },

    /// Token mint is missing, malformed, unknown or has no readable metadata
    #[error("Unresolved asset: {0}")]
    UnresolvedAsset(String),

    /// The signer declined to sign the transaction
    #[error("Transaction rejected by signer: {0}")]
    UserRejected(String),

    /// Network or broadcast failure while submitting
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// Confirmation timed out or the ledger reported the transaction failed
    #[error("Confirmation failed: {0}")]
    ConfirmationFailed(String),

    /// Ledger query failed (blockhash, account existence, mint lookup)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program the instruction targets
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Planned instruction sequence violates ordering rules
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    /// Another batch from this executor has not finished yet
    #[error("A batch is already being submitted")]
    AlreadyInFlight,

    /// Configuration or validation error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "invalid_address",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::UnresolvedAsset(_) => "unresolved_asset",
            Self::UserRejected(_) => "user_rejected",
            Self::SubmissionFailed(_) => "submission",
            Self::ConfirmationFailed(_) => "confirmation",
            Self::Rpc(_) => "rpc",
            Self::InstructionBuild { .. } => "instruction",
            Self::InvalidInstructionOrder(_) => "validation",
            Self::AlreadyInFlight => "in_flight",
            Self::Configuration(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// True for errors raised before anything was broadcast
    pub fn is_pre_broadcast(&self) -> bool {
        !matches!(
            self,
            Self::SubmissionFailed(_) | Self::ConfirmationFailed(_)
        )
    }
}

// Convenience constructors for common error scenarios
impl BatchError {
    pub fn invalid_address(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid_amount(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            index,
            reason: reason.into(),
        }
    }

    pub fn unresolved_asset(reason: impl Into<String>) -> Self {
        Self::UnresolvedAsset(reason.into())
    }

    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}
