//! Asset and token account resolution
//!
//! Turns an [`AssetSelection`] into a concrete mint with its precision and
//! answers which associated token accounts already exist.

use crate::amount::NATIVE_DECIMALS;
use crate::ledger::LedgerClient;
use crate::tx_builder::errors::BatchError;
use crate::types::{AssetSelection, KnownAssetRegistry};
use crate::validation::parse_address;
use futures::future::try_join_all;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use tracing::debug;

/// Asset with everything the planner needs to convert amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAsset {
    Native,
    Token { mint: Pubkey, decimals: u8 },
}

impl ResolvedAsset {
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Native => NATIVE_DECIMALS,
            Self::Token { decimals, .. } => *decimals,
        }
    }

    pub fn mint(&self) -> Option<Pubkey> {
        match self {
            Self::Native => None,
            Self::Token { mint, .. } => Some(*mint),
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Self::Token { .. })
    }
}

/// Associated token account of `owner` for `mint`. Derived, never looked up.
pub fn associated_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Mint referenced by a selection, or `None` for the native asset
pub fn resolve_mint(
    asset: &AssetSelection,
    registry: &KnownAssetRegistry,
) -> Result<Option<Pubkey>, BatchError> {
    match asset {
        AssetSelection::Native => Ok(None),
        AssetSelection::KnownToken(symbol) => registry
            .mint_for(symbol)
            .map(Some)
            .ok_or_else(|| {
                let known: Vec<&str> = registry.symbols().collect();
                BatchError::unresolved_asset(format!(
                    "unknown token {} (known: {})",
                    symbol,
                    known.join(", ")
                ))
            }),
        AssetSelection::CustomToken(mint) => {
            let mint = mint.trim();
            if mint.is_empty() {
                return Err(BatchError::unresolved_asset("custom token mint is empty"));
            }
            parse_address(mint)
                .map(Some)
                .map_err(|e| BatchError::unresolved_asset(format!("mint {}: {}", mint, e)))
        }
    }
}

#[derive(Clone)]
pub struct AccountResolver {
    ledger: Arc<dyn LedgerClient>,
}

impl AccountResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Resolve the selection and, for tokens, read the mint's decimals
    pub async fn resolve_asset(
        &self,
        asset: &AssetSelection,
        registry: &KnownAssetRegistry,
    ) -> Result<ResolvedAsset, BatchError> {
        let Some(mint) = resolve_mint(asset, registry)? else {
            return Ok(ResolvedAsset::Native);
        };
        let decimals = self.ledger.mint_decimals(&mint).await?;
        debug!(mint = %mint, decimals, "Resolved token mint");
        Ok(ResolvedAsset::Token { mint, decimals })
    }

    /// Existence of each account, queried concurrently, in input order
    pub async fn existing_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<bool>, BatchError> {
        try_join_all(addresses.iter().map(|address| self.ledger.account_exists(address))).await
    }
}

impl std::fmt::Debug for AccountResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountResolver").finish_non_exhaustive()
    }
}
