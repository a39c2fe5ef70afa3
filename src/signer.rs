//! Signing and broadcast
//!
//! The executor never holds key material. It hands a compiled message to a
//! [`TransactionSigner`], which signs it as fee payer and returns the
//! signature under which the transaction was broadcast.

use crate::tx_builder::BatchError;
use crate::wallet::Wallet;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    message::VersionedMessage, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account that pays fees and authorizes transfers
    fn pubkey(&self) -> Pubkey;

    /// Sign `message` and submit it to the network
    ///
    /// Returns [`BatchError::UserRejected`] if the signature was refused and
    /// [`BatchError::SubmissionFailed`] if the network did not accept it.
    async fn sign_and_broadcast(&self, message: VersionedMessage) -> Result<Signature, BatchError>;
}

/// Signs with a local keypair and submits over RPC
pub struct KeypairSigner {
    wallet: Wallet,
    client: Arc<RpcClient>,
}

impl KeypairSigner {
    pub fn new(wallet: Wallet, client: Arc<RpcClient>) -> Self {
        Self { wallet, client }
    }

    fn sign(&self, message: VersionedMessage) -> Result<VersionedTransaction, BatchError> {
        VersionedTransaction::try_new(message, &[self.wallet.keypair()])
            .map_err(|e| BatchError::UserRejected(e.to_string()))
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    async fn sign_and_broadcast(&self, message: VersionedMessage) -> Result<Signature, BatchError> {
        let transaction = self.sign(message)?;
        let signature = self
            .client
            .send_transaction(&transaction)
            .await
            .map_err(|e| BatchError::SubmissionFailed(e.to_string()))?;

        debug!(signature = %signature, "Transaction broadcast");
        Ok(signature)
    }
}
