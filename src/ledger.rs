//! Ledger access
//!
//! [`LedgerClient`] is the read side the planner and executor need from the
//! chain. [`RpcLedgerClient`] implements it over the nonblocking Solana RPC
//! client; tests substitute an in-memory double.

use crate::tx_builder::BatchError;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
};
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

pub type LedgerResult<T> = Result<T, BatchError>;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Recent blockhash the transaction must reference
    async fn latest_blockhash(&self) -> LedgerResult<Hash>;

    /// Whether an account currently exists on chain
    async fn account_exists(&self, address: &Pubkey) -> LedgerResult<bool>;

    /// Decimal precision of an SPL mint
    async fn mint_decimals(&self, mint: &Pubkey) -> LedgerResult<u8>;

    /// Wait until the signature reaches `commitment` or fails
    async fn confirm(&self, signature: &Signature, commitment: CommitmentConfig)
        -> LedgerResult<()>;

    /// Lamport balance of an account
    async fn balance(&self, owner: &Pubkey) -> LedgerResult<u64>;

    /// Raw token amount held by a token account
    async fn token_balance(&self, token_account: &Pubkey) -> LedgerResult<u64>;
}

/// Confirmation polling parameters
#[derive(Debug, Clone, Copy)]
pub struct ConfirmPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct RpcLedgerClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    confirm_policy: ConfirmPolicy,
}

impl RpcLedgerClient {
    pub fn new(client: Arc<RpcClient>, confirm_policy: ConfirmPolicy) -> Self {
        let commitment = client.commitment();
        Self {
            client,
            commitment,
            confirm_policy,
        }
    }

    pub fn from_url(
        url: impl Into<String>,
        request_timeout: Duration,
        commitment: CommitmentConfig,
        confirm_policy: ConfirmPolicy,
    ) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(url.into(), request_timeout, commitment);
        Self::new(Arc::new(client), confirm_policy)
    }

    /// Shared handle for components that broadcast through the same endpoint
    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("url", &self.client.url())
            .field("commitment", &self.commitment)
            .field("confirm_policy", &self.confirm_policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn latest_blockhash(&self) -> LedgerResult<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| BatchError::Rpc(format!("Failed to fetch blockhash: {}", e)))
    }

    async fn account_exists(&self, address: &Pubkey) -> LedgerResult<bool> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| BatchError::Rpc(format!("Failed to fetch account {}: {}", address, e)))?;
        Ok(response.value.is_some())
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> LedgerResult<u8> {
        let account = self
            .client
            .get_account_with_commitment(mint, self.commitment)
            .await
            .map_err(|e| BatchError::unresolved_asset(format!("mint {}: {}", mint, e)))?
            .value
            .ok_or_else(|| BatchError::unresolved_asset(format!("mint {} not found", mint)))?;

        if account.owner != spl_token::id() {
            return Err(BatchError::unresolved_asset(format!(
                "account {} is not owned by the token program",
                mint
            )));
        }
        if account.data.len() < Mint::LEN {
            return Err(BatchError::unresolved_asset(format!(
                "account {} is too small to be a mint",
                mint
            )));
        }

        let state = Mint::unpack(&account.data[..Mint::LEN])
            .map_err(|e| BatchError::unresolved_asset(format!("mint {}: {}", mint, e)))?;
        Ok(state.decimals)
    }

    #[instrument(skip(self), fields(signature = %signature))]
    async fn confirm(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<()> {
        let started = Instant::now();

        loop {
            match self
                .client
                .get_signature_status_with_commitment(signature, commitment)
                .await
            {
                Ok(Some(Ok(()))) => {
                    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Signature confirmed");
                    return Ok(());
                }
                Ok(Some(Err(tx_err))) => {
                    return Err(BatchError::ConfirmationFailed(format!(
                        "transaction failed on chain: {}",
                        tx_err
                    )));
                }
                Ok(None) => {}
                Err(e) => {
                    // Transient status errors are polled through until the deadline
                    warn!(error = %e, "Signature status query failed");
                }
            }

            if started.elapsed() >= self.confirm_policy.timeout {
                return Err(BatchError::ConfirmationFailed(format!(
                    "not confirmed within {:?}",
                    self.confirm_policy.timeout
                )));
            }
            tokio::time::sleep(self.confirm_policy.poll_interval).await;
        }
    }

    async fn balance(&self, owner: &Pubkey) -> LedgerResult<u64> {
        self.client
            .get_balance(owner)
            .await
            .map_err(|e| BatchError::Rpc(format!("Failed to fetch balance of {}: {}", owner, e)))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> LedgerResult<u64> {
        let ui_amount = self
            .client
            .get_token_account_balance(token_account)
            .await
            .map_err(|e| {
                BatchError::Rpc(format!(
                    "Failed to fetch token balance of {}: {}",
                    token_account, e
                ))
            })?;
        ui_amount.amount.parse::<u64>().map_err(|e| {
            BatchError::Rpc(format!(
                "Unexpected token amount '{}': {}",
                ui_amount.amount, e
            ))
        })
    }
}
