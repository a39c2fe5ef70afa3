//! Execution context for compiling a batch
//!
//! Captures the blockhash and fee payer a single submission attempt compiles
//! against.

use crate::tx_builder::errors::BatchError;
use crate::tx_builder::output::TxBuildOutput;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
};

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Recent blockhash fetched for this attempt
    pub blockhash: Hash,

    /// Sender; pays fees and signs every transfer
    pub fee_payer: Pubkey,
}

impl ExecutionContext {
    pub fn new(blockhash: Hash, fee_payer: Pubkey) -> Self {
        Self {
            blockhash,
            fee_payer,
        }
    }

    /// Compile instructions into one v0 message without lookup tables
    pub fn compile(&self, instructions: &[Instruction]) -> Result<TxBuildOutput, BatchError> {
        let message = v0::Message::try_compile(&self.fee_payer, instructions, &[], self.blockhash)
            .map_err(|e| BatchError::internal(format!("Failed to compile message: {}", e)))?;
        Ok(TxBuildOutput::new(VersionedMessage::V0(message)))
    }
}
