//! Integration tests for the batch executor
//!
//! Drives `BatchExecutor` through the public `LedgerClient` and
//! `TransactionSigner` seams with minimal in-test implementations.

use async_trait::async_trait;
use multisend::tx_builder::associated_account;
use multisend::{
    AssetSelection, BatchError, BatchExecutor, BatchState, FeeEstimator, KnownAssetRegistry,
    LedgerClient, Pubkey, Signature, TransactionLifecycle, TransactionSigner, TxStatus,
    VersionedMessage,
};
use solana_sdk::{commitment_config::CommitmentConfig, hash::Hash};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Ledger where only the listed accounts exist and every mint has 6 decimals
struct StaticLedger {
    existing: HashSet<Pubkey>,
    mint: Pubkey,
    confirm_ok: bool,
}

#[async_trait]
impl LedgerClient for StaticLedger {
    async fn latest_blockhash(&self) -> Result<Hash, BatchError> {
        Ok(Hash::default())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, BatchError> {
        Ok(self.existing.contains(address))
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, BatchError> {
        if *mint == self.mint {
            Ok(6)
        } else {
            Err(BatchError::UnresolvedAsset(mint.to_string()))
        }
    }

    async fn confirm(&self, _: &Signature, _: CommitmentConfig) -> Result<(), BatchError> {
        if self.confirm_ok {
            Ok(())
        } else {
            Err(BatchError::ConfirmationFailed("timed out".to_string()))
        }
    }

    async fn balance(&self, _: &Pubkey) -> Result<u64, BatchError> {
        Ok(u64::MAX)
    }

    async fn token_balance(&self, _: &Pubkey) -> Result<u64, BatchError> {
        Err(BatchError::Rpc("not tracked".to_string()))
    }
}

/// Signer that records the instruction count of every message it sees
struct RecordingSigner {
    key: Pubkey,
    seen: Mutex<Vec<usize>>,
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    fn pubkey(&self) -> Pubkey {
        self.key
    }

    async fn sign_and_broadcast(&self, message: VersionedMessage) -> Result<Signature, BatchError> {
        self.seen.lock().unwrap().push(message.instructions().len());
        Ok(Signature::from([1u8; 64]))
    }
}

fn setup(existing: &[Pubkey], mint: Pubkey, confirm_ok: bool) -> (BatchExecutor, Arc<RecordingSigner>) {
    let ledger = StaticLedger {
        existing: existing.iter().copied().collect(),
        mint,
        confirm_ok,
    };
    let signer = Arc::new(RecordingSigner {
        key: Pubkey::new_unique(),
        seen: Mutex::new(Vec::new()),
    });
    let executor = BatchExecutor::new(
        Arc::new(ledger),
        Arc::clone(&signer) as Arc<dyn TransactionSigner>,
        KnownAssetRegistry::devnet(),
    )
    .with_fee_estimator(FeeEstimator::new(10_000, 2_000_000));
    (executor, signer)
}

#[tokio::test]
async fn test_token_batch_end_to_end() {
    let mint = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    let (executor, signer) = setup(&[associated_account(&b, &mint)], mint, true);

    let batch = BatchState::with_recipients(
        AssetSelection::CustomToken(mint.to_string()),
        vec![(a.to_string(), "1.5".to_string()), (b.to_string(), "2".to_string())],
    );
    let mut lifecycle = TransactionLifecycle::new();
    let signature = executor
        .handle_send(&batch, &mut lifecycle)
        .await
        .unwrap();

    assert_eq!(signature, Some(Signature::from([1u8; 64])));
    assert_eq!(lifecycle.status(), TxStatus::Success);
    assert_eq!(
        lifecycle.message().unwrap(),
        format!("Successfully sent 3.500000 {} to 2 recipient(s)", mint)
    );
    // create(A), transfer(A), transfer(B)
    assert_eq!(*signer.seen.lock().unwrap(), vec![3]);
}

#[tokio::test]
async fn test_confirmation_timeout_leaves_error_state() {
    let (executor, signer) = setup(&[], Pubkey::new_unique(), false);
    let batch = BatchState::with_recipients(
        AssetSelection::Native,
        vec![(Pubkey::new_unique().to_string(), "0.01".to_string())],
    );
    let mut lifecycle = TransactionLifecycle::new();

    let result = executor.handle_send(&batch, &mut lifecycle).await;

    assert!(matches!(result, Err(BatchError::ConfirmationFailed(_))));
    assert_eq!(lifecycle.status(), TxStatus::Error);
    assert_eq!(lifecycle.signature(), None);
    assert_eq!(signer.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fee_estimate_uses_configured_schedule() {
    let (executor, _) = setup(&[], Pubkey::new_unique(), true);
    let mut batch = BatchState::with_recipients(
        AssetSelection::Native,
        vec![("x", "1"), ("y", "1")],
    );
    assert_eq!(executor.estimate_fee(&batch).lamports, 10_000);

    batch.set_asset(AssetSelection::KnownToken("USDT".to_string()));
    assert_eq!(executor.estimate_fee(&batch).lamports, 10_000 + 2 * 2_000_000);
}

#[tokio::test]
async fn test_token_balance_unavailable_is_advisory() {
    let mint = Pubkey::new_unique();
    let (executor, _) = setup(&[], mint, true);
    let batch = BatchState::with_recipients(
        AssetSelection::CustomToken(mint.to_string()),
        vec![(Pubkey::new_unique().to_string(), "4".to_string())],
    );

    let check = executor.check_balance(&batch).await;
    assert_eq!(check.current, None);
    assert_eq!(check.required, 4_000_000);
    assert!(!check.sufficient);
}
