//! Instruction planning and ordering validation
//!
//! A batch becomes one ordered instruction list:
//! - Native: one system transfer per recipient
//! - Token: per recipient, an associated token account creation when the
//!   account is missing, immediately followed by the token transfer into it.
//!   A recipient listed more than once gets its account created only once.
//!
//! Order always follows recipient order. Amounts are converted to base units
//! by exact decimal truncation.

use crate::amount::DecimalAmount;
use crate::tx_builder::accounts::{associated_account, AccountResolver, ResolvedAsset};
use crate::tx_builder::errors::BatchError;
use crate::types::{AssetSelection, KnownAssetRegistry, Recipient};
use crate::validation::parse_address;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::instruction::create_associated_token_account;
use std::collections::HashSet;
use tracing::debug;

/// `spl_token` instruction tag for `Transfer`
const TOKEN_TRANSFER_TAG: u8 = 3;

/// A recipient after decode and amount conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub destination: Pubkey,
    pub base_units: u64,
}

/// Ordered instructions for one batch plus what the summary needs
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,
    pub asset: ResolvedAsset,
    pub recipient_count: usize,
    /// Distinct associated token accounts the plan creates
    pub accounts_created: usize,
    pub total_base_units: u64,
}

impl InstructionPlan {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Decode every recipient and convert its amount at `decimals`
///
/// Fails on the first recipient whose address does not decode or whose
/// amount is not positive or overflows.
pub fn decode_transfers(
    recipients: &[Recipient],
    decimals: u8,
) -> Result<Vec<PlannedTransfer>, BatchError> {
    recipients
        .iter()
        .enumerate()
        .map(|(index, recipient)| {
            let destination = parse_address(&recipient.address)
                .map_err(|e| BatchError::invalid_address(index, e.to_string()))?;
            let base_units = DecimalAmount::parse_positive(&recipient.amount)
                .and_then(|amount| amount.to_base_units(decimals))
                .map_err(|e| BatchError::invalid_amount(index, e.to_string()))?;
            Ok(PlannedTransfer {
                destination,
                base_units,
            })
        })
        .collect()
}

fn total_of(transfers: &[PlannedTransfer]) -> u64 {
    transfers
        .iter()
        .fold(0u64, |acc, t| acc.saturating_add(t.base_units))
}

/// One system transfer per recipient, no ledger access
#[allow(deprecated)]
pub fn plan_native_transfers(sender: &Pubkey, transfers: &[PlannedTransfer]) -> InstructionPlan {
    let instructions = transfers
        .iter()
        .map(|t| system_instruction::transfer(sender, &t.destination, t.base_units))
        .collect();

    InstructionPlan {
        instructions,
        asset: ResolvedAsset::Native,
        recipient_count: transfers.len(),
        accounts_created: 0,
        total_base_units: total_of(transfers),
    }
}

/// Token transfers with account creation where `destination_exists` is false
///
/// `destination_exists[i]` describes the associated token account of
/// `transfers[i].destination`. Each missing account is created at its first
/// occurrence only.
pub fn plan_token_transfers(
    sender: &Pubkey,
    mint: &Pubkey,
    decimals: u8,
    transfers: &[PlannedTransfer],
    destination_exists: &[bool],
) -> Result<InstructionPlan, BatchError> {
    if transfers.len() != destination_exists.len() {
        return Err(BatchError::internal(format!(
            "{} transfers but {} existence results",
            transfers.len(),
            destination_exists.len()
        )));
    }

    let source = associated_account(sender, mint);
    let mut instructions = Vec::with_capacity(transfers.len() * 2);
    let mut created = HashSet::new();

    for (transfer, exists) in transfers.iter().zip(destination_exists) {
        let destination = associated_account(&transfer.destination, mint);

        if !exists && created.insert(destination) {
            instructions.push(create_associated_token_account(
                sender,
                &transfer.destination,
                mint,
                &spl_token::id(),
            ));
        }

        let ix = spl_token::instruction::transfer(
            &spl_token::id(),
            &source,
            &destination,
            sender,
            &[],
            transfer.base_units,
        )
        .map_err(|e| BatchError::instruction_failed("spl_token", e.to_string()))?;
        instructions.push(ix);
    }

    Ok(InstructionPlan {
        instructions,
        asset: ResolvedAsset::Token {
            mint: *mint,
            decimals,
        },
        recipient_count: transfers.len(),
        accounts_created: created.len(),
        total_base_units: total_of(transfers),
    })
}

/// Resolve the asset, convert amounts, check destination accounts and
/// produce the ordered plan
pub async fn plan_batch(
    resolver: &AccountResolver,
    registry: &KnownAssetRegistry,
    sender: &Pubkey,
    recipients: &[Recipient],
    asset: &AssetSelection,
) -> Result<InstructionPlan, BatchError> {
    if recipients.is_empty() {
        return Err(BatchError::Configuration("batch has no recipients".to_string()));
    }
    let resolved = resolver.resolve_asset(asset, registry).await?;
    let transfers = decode_transfers(recipients, resolved.decimals())?;

    let plan = match resolved {
        ResolvedAsset::Native => plan_native_transfers(sender, &transfers),
        ResolvedAsset::Token { mint, decimals } => {
            let destinations: Vec<Pubkey> = transfers
                .iter()
                .map(|t| associated_account(&t.destination, &mint))
                .collect();
            let exists = resolver.existing_accounts(&destinations).await?;
            plan_token_transfers(sender, &mint, decimals, &transfers, &exists)?
        }
    };

    sanity_check_ix_order(&plan.instructions)?;

    debug!(
        recipients = plan.recipient_count,
        instructions = plan.len(),
        accounts_created = plan.accounts_created,
        "Planned batch"
    );
    Ok(plan)
}

/// Validate that every account creation is immediately followed by a token
/// transfer into the created account (debug/test only)
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<(), BatchError> {
    if instructions.is_empty() {
        return Err(BatchError::invalid_order("Instruction list is empty"));
    }

    let is_ata_create = |ix: &Instruction| ix.program_id == spl_associated_token_account::id();

    for (idx, ix) in instructions.iter().enumerate() {
        if !is_ata_create(ix) {
            continue;
        }
        // create_associated_token_account accounts: [payer, ata, owner, mint, ...]
        let created = ix.accounts.get(1).map(|meta| meta.pubkey).ok_or_else(|| {
            BatchError::invalid_order(format!("Account creation at {} has no target", idx))
        })?;

        let next = instructions.get(idx + 1).ok_or_else(|| {
            BatchError::invalid_order(format!(
                "Account creation at {} is the last instruction",
                idx
            ))
        })?;

        let is_transfer_into_created = next.program_id == spl_token::id()
            && next.data.first() == Some(&TOKEN_TRANSFER_TAG)
            // transfer accounts: [source, destination, authority, ...]
            && next.accounts.get(1).map(|meta| meta.pubkey) == Some(created);

        if !is_transfer_into_created {
            return Err(BatchError::invalid_order(format!(
                "Account creation for {} at {} is not followed by a transfer into it",
                created, idx
            )));
        }
    }

    Ok(())
}

/// No-op version of sanity_check_ix_order for release builds
#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(_instructions: &[Instruction]) -> Result<(), BatchError> {
    Ok(())
}
