//! Batch transaction builder
//!
//! Turns a validated batch into one signed, confirmed transaction.
//!
//! ## Architecture
//!
//! - **errors**: [`BatchError`] taxonomy with a category label per variant
//! - **accounts**: asset resolution and associated token account lookups
//! - **instructions**: ordered instruction planning and order validation
//! - **context**: blockhash and fee payer for one attempt, message compilation
//! - **output**: compiled message with signer and size facts
//! - **builder**: [`BatchExecutor`], the submission pipeline
//!
//! ## Pipeline
//!
//! ```text
//! BatchState ─▶ validate ─▶ plan (resolve asset, check accounts)
//!            ─▶ blockhash ─▶ compile v0 ─▶ sign + broadcast ─▶ confirm
//! ```
//!
//! The caller's [`crate::lifecycle::TransactionLifecycle`] moves through
//! "Preparing", "Sending" and "Confirming" and ends in success or error.

pub mod errors;
pub use errors::BatchError;

pub mod accounts;
mod builder;
mod context;
pub mod instructions;
mod output;

pub use accounts::{associated_account, resolve_mint, AccountResolver, ResolvedAsset};
pub use builder::{
    BalanceCheck, BatchExecutor, PHASE_CONFIRMING, PHASE_PREPARING, PHASE_SENDING,
};
pub use context::ExecutionContext;
pub use instructions::{
    decode_transfers, plan_batch, plan_native_transfers, plan_token_transfers,
    sanity_check_ix_order, InstructionPlan, PlannedTransfer,
};
pub use output::TxBuildOutput;
