//! Test Utilities Module
//!
//! In-memory ledger and signer doubles for deterministic tests of planning
//! and submission. No network access.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::ledger::{LedgerClient, LedgerResult};
use crate::signer::TransactionSigner;
use crate::tx_builder::BatchError;
use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, message::VersionedMessage, pubkey::Pubkey,
    signature::Signature,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Ledger double backed by in-memory maps
///
/// Every lookup that is not configured behaves like a missing account.
pub struct MockLedgerClient {
    blockhash: Hash,
    accounts: HashSet<Pubkey>,
    mints: HashMap<Pubkey, u8>,
    balances: HashMap<Pubkey, u64>,
    token_balances: HashMap<Pubkey, u64>,
    fail_blockhash: bool,
    fail_account_lookups: bool,
    confirm_error: Option<String>,
    exists_queries: AtomicUsize,
    confirmed: Mutex<Vec<Signature>>,
}

impl MockLedgerClient {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            accounts: HashSet::new(),
            mints: HashMap::new(),
            balances: HashMap::new(),
            token_balances: HashMap::new(),
            fail_blockhash: false,
            fail_account_lookups: false,
            confirm_error: None,
            exists_queries: AtomicUsize::new(0),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account(mut self, address: Pubkey) -> Self {
        self.accounts.insert(address);
        self
    }

    /// Register a mint; the mint account also exists
    pub fn with_mint(mut self, mint: Pubkey, decimals: u8) -> Self {
        self.mints.insert(mint, decimals);
        self.accounts.insert(mint);
        self
    }

    pub fn with_balance(mut self, owner: Pubkey, lamports: u64) -> Self {
        self.balances.insert(owner, lamports);
        self
    }

    /// Token amount held by a token account; the account also exists
    pub fn with_token_balance(mut self, token_account: Pubkey, amount: u64) -> Self {
        self.token_balances.insert(token_account, amount);
        self.accounts.insert(token_account);
        self
    }

    pub fn failing_blockhash(mut self) -> Self {
        self.fail_blockhash = true;
        self
    }

    pub fn failing_account_lookups(mut self) -> Self {
        self.fail_account_lookups = true;
        self
    }

    /// Confirmation reports the given failure for every signature
    pub fn failing_confirmation(mut self, reason: impl Into<String>) -> Self {
        self.confirm_error = Some(reason.into());
        self
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    /// Number of account existence queries answered so far
    pub fn exists_queries(&self) -> usize {
        self.exists_queries.load(Ordering::SeqCst)
    }

    pub async fn confirmed_signatures(&self) -> Vec<Signature> {
        self.confirmed.lock().await.clone()
    }
}

impl Default for MockLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn latest_blockhash(&self) -> LedgerResult<Hash> {
        if self.fail_blockhash {
            return Err(BatchError::Rpc("blockhash unavailable".to_string()));
        }
        Ok(self.blockhash)
    }

    async fn account_exists(&self, address: &Pubkey) -> LedgerResult<bool> {
        self.exists_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_account_lookups {
            return Err(BatchError::Rpc(format!("lookup of {} failed", address)));
        }
        Ok(self.accounts.contains(address))
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> LedgerResult<u8> {
        self.mints
            .get(mint)
            .copied()
            .ok_or_else(|| BatchError::unresolved_asset(format!("mint {} not found", mint)))
    }

    async fn confirm(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<()> {
        if let Some(reason) = &self.confirm_error {
            return Err(BatchError::ConfirmationFailed(reason.clone()));
        }
        self.confirmed.lock().await.push(*signature);
        Ok(())
    }

    async fn balance(&self, owner: &Pubkey) -> LedgerResult<u64> {
        self.balances
            .get(owner)
            .copied()
            .ok_or_else(|| BatchError::Rpc(format!("no balance for {}", owner)))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> LedgerResult<u64> {
        self.token_balances
            .get(token_account)
            .copied()
            .ok_or_else(|| BatchError::Rpc(format!("no token account {}", token_account)))
    }
}

/// How a [`MockSigner`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerFailure {
    Reject,
    Submission,
}

/// Signer double that records every message it is asked to sign
pub struct MockSigner {
    pubkey: Pubkey,
    signature: Signature,
    failure: Option<SignerFailure>,
    delay: Option<Duration>,
    broadcasts: AtomicUsize,
    messages: Mutex<Vec<VersionedMessage>>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::with_pubkey(Pubkey::new_unique())
    }

    pub fn with_pubkey(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            signature: Signature::from([7u8; 64]),
            failure: None,
            delay: None,
            broadcasts: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, failure: SignerFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Hold each broadcast open for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub async fn messages(&self) -> Vec<VersionedMessage> {
        self.messages.lock().await.clone()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_and_broadcast(&self, message: VersionedMessage) -> Result<Signature, BatchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.messages.lock().await.push(message);

        match self.failure {
            Some(SignerFailure::Reject) => {
                Err(BatchError::UserRejected("user declined".to_string()))
            }
            Some(SignerFailure::Submission) => {
                self.broadcasts.fetch_add(1, Ordering::SeqCst);
                Err(BatchError::SubmissionFailed("node unavailable".to_string()))
            }
            None => {
                self.broadcasts.fetch_add(1, Ordering::SeqCst);
                Ok(self.signature)
            }
        }
    }
}
