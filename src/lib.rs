//! multisend - batch SOL and SPL token transfers
//!
//! Sends one asset to many recipients in a single transaction. Token
//! batches create missing associated token accounts for their recipients on
//! the way.

pub mod amount;
pub mod config;
pub mod fees;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
pub mod signer;
pub mod structured_logging;
pub mod tx_builder;
pub mod types;
pub mod validation;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use fees::{estimate_fee, FeeEstimate, FeeEstimator};
pub use ledger::{LedgerClient, RpcLedgerClient};
pub use lifecycle::{TransactionLifecycle, TxStatus};
pub use signer::{KeypairSigner, TransactionSigner};
pub use tx_builder::{BalanceCheck, BatchError, BatchExecutor, InstructionPlan};
pub use types::{AssetSelection, BatchState, KnownAssetRegistry, Recipient, RecipientUpdate};
pub use validation::{is_valid_address, is_valid_amount, validate_batch, validate_recipients};

// Re-export commonly used types
pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey, signature::Signature};
