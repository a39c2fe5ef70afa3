//! Batch executor
//!
//! Orchestrates one submission: plan the batch, compile it into a single v0
//! transaction, hand it to the signer, wait for confirmation. Every step
//! short-circuits the whole batch on failure and nothing is retried.

use crate::amount::{format_display_units, DecimalAmount};
use crate::fees::{FeeEstimate, FeeEstimator};
use crate::ledger::LedgerClient;
use crate::lifecycle::TransactionLifecycle;
use crate::metrics::{metrics, Timer};
use crate::signer::TransactionSigner;
use crate::structured_logging::BatchLogger;
use crate::tx_builder::accounts::{associated_account, AccountResolver, ResolvedAsset};
use crate::tx_builder::context::ExecutionContext;
use crate::tx_builder::errors::BatchError;
use crate::tx_builder::instructions::{plan_batch, InstructionPlan};
use crate::types::{BatchState, KnownAssetRegistry};
use crate::validation::validate_batch;
use serde::Serialize;
use solana_sdk::{
    commitment_config::CommitmentConfig, packet::PACKET_DATA_SIZE, pubkey::Pubkey,
    signature::Signature,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub const PHASE_PREPARING: &str = "Preparing transaction...";
pub const PHASE_SENDING: &str = "Sending transaction...";
pub const PHASE_CONFIRMING: &str = "Confirming transaction...";

/// Sender balance compared with what a batch would move, in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceCheck {
    /// `None` when the balance could not be read
    pub current: Option<u64>,
    pub required: u64,
    pub sufficient: bool,
}

impl BalanceCheck {
    fn unavailable(required: u64) -> Self {
        Self {
            current: None,
            required,
            sufficient: false,
        }
    }
}

pub struct BatchExecutor {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn TransactionSigner>,
    resolver: AccountResolver,
    registry: KnownAssetRegistry,
    fees: FeeEstimator,
    commitment: CommitmentConfig,
    in_flight: AtomicBool,
}

impl BatchExecutor {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn TransactionSigner>,
        registry: KnownAssetRegistry,
    ) -> Self {
        Self {
            resolver: AccountResolver::new(Arc::clone(&ledger)),
            ledger,
            signer,
            registry,
            fees: FeeEstimator::default(),
            commitment: CommitmentConfig::confirmed(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_fee_estimator(mut self, fees: FeeEstimator) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn sender(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn registry(&self) -> &KnownAssetRegistry {
        &self.registry
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ordered instructions for the batch, querying which destination
    /// token accounts already exist
    pub async fn build_plan(&self, batch: &BatchState) -> Result<InstructionPlan, BatchError> {
        let plan = plan_batch(
            &self.resolver,
            &self.registry,
            &self.sender(),
            &batch.recipients,
            &batch.asset,
        )
        .await?;

        metrics()
            .instructions_planned
            .inc_by(plan.instructions.len() as u64);
        metrics().accounts_created.inc_by(plan.accounts_created as u64);
        Ok(plan)
    }

    /// Compile, sign, broadcast and confirm an existing plan
    pub async fn submit(&self, plan: &InstructionPlan) -> Result<Signature, BatchError> {
        let _guard = self.acquire()?;
        let logger = BatchLogger::new();
        let timer = Timer::new();

        let result = self.execute(plan, None, &logger).await;
        record_outcome(result.as_ref(), &logger, &timer);
        result
    }

    /// Validate, plan and submit a batch, driving the caller's lifecycle
    ///
    /// Returns `Ok(None)` without touching the lifecycle when the batch does
    /// not validate. Any later failure moves the lifecycle to `Error` and is
    /// also returned.
    pub async fn handle_send(
        &self,
        batch: &BatchState,
        lifecycle: &mut TransactionLifecycle,
    ) -> Result<Option<Signature>, BatchError> {
        if !validate_batch(&batch.recipients) {
            debug!(recipients = batch.len(), "Batch did not validate, nothing sent");
            return Ok(None);
        }
        if lifecycle.is_pending() {
            return Err(BatchError::AlreadyInFlight);
        }

        let _guard = self.acquire()?;
        let logger = BatchLogger::new();
        let timer = Timer::new();

        lifecycle.begin(PHASE_PREPARING).map_err(lifecycle_error)?;

        let result = match self.build_plan(batch).await {
            Ok(plan) => {
                logger.log_planned(
                    &batch.asset.display_symbol(),
                    plan.recipient_count,
                    plan.instructions.len(),
                    plan.accounts_created,
                );
                self.execute(&plan, Some(&mut *lifecycle), &logger)
                    .await
                    .map(|signature| (signature, plan))
            }
            Err(e) => Err(e),
        };
        record_outcome(
            result.as_ref().map(|(signature, _)| signature),
            &logger,
            &timer,
        );

        match result {
            Ok((signature, plan)) => {
                let summary = format!(
                    "Successfully sent {} {} to {} recipient(s)",
                    format_display_units(plan.total_base_units, plan.asset.decimals()),
                    batch.asset.display_symbol(),
                    plan.recipient_count
                );
                lifecycle
                    .succeed(&signature, summary)
                    .map_err(lifecycle_error)?;
                Ok(Some(signature))
            }
            Err(e) => {
                lifecycle.fail(e.to_string()).map_err(lifecycle_error)?;
                Err(e)
            }
        }
    }

    /// Advisory network cost of the batch; never consulted by submission
    pub fn estimate_fee(&self, batch: &BatchState) -> FeeEstimate {
        self.fees.estimate(batch.len(), !batch.asset.is_native())
    }

    /// Compare the sender's balance of the selected asset with the batch total
    ///
    /// Amounts that do not parse are left out of `required`. Ledger failures
    /// degrade to `current: None`.
    pub async fn check_balance(&self, batch: &BatchState) -> BalanceCheck {
        let asset = match self.resolver.resolve_asset(&batch.asset, &self.registry).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!(error = %e, "Balance check skipped, asset unresolved");
                return BalanceCheck::unavailable(0);
            }
        };

        let required = batch
            .recipients
            .iter()
            .filter_map(|r| DecimalAmount::parse(&r.amount).ok())
            .filter_map(|a| a.to_base_units(asset.decimals()).ok())
            .fold(0u64, u64::saturating_add);

        let sender = self.sender();
        let current = match asset {
            ResolvedAsset::Native => self.ledger.balance(&sender).await,
            ResolvedAsset::Token { mint, .. } => {
                self.ledger
                    .token_balance(&associated_account(&sender, &mint))
                    .await
            }
        };

        match current {
            Ok(current) => BalanceCheck {
                current: Some(current),
                required,
                sufficient: current >= required,
            },
            Err(e) => {
                warn!(error = %e, "Balance unavailable");
                BalanceCheck::unavailable(required)
            }
        }
    }

    /// Phases are reported to `lifecycle` when the caller tracks one
    async fn execute(
        &self,
        plan: &InstructionPlan,
        mut lifecycle: Option<&mut TransactionLifecycle>,
        logger: &BatchLogger,
    ) -> Result<Signature, BatchError> {
        let blockhash = self.ledger.latest_blockhash().await?;
        let ctx = ExecutionContext::new(blockhash, self.sender());
        let output = ctx.compile(&plan.instructions)?;
        debug!(
            correlation_id = logger.correlation_id(),
            blockhash = %blockhash,
            signers = output.required_signers().len(),
            "Compiled batch message"
        );

        if output.exceeds_packet_limit() {
            logger.log_oversized(output.serialized_size, PACKET_DATA_SIZE);
        }

        if let Some(lifecycle) = lifecycle.as_deref_mut() {
            lifecycle.set_phase(PHASE_SENDING).map_err(lifecycle_error)?;
        }
        logger.log_submitting(output.serialized_size);
        metrics().batches_submitted.inc();

        let signature = self.signer.sign_and_broadcast(output.into_message()).await?;

        if let Some(lifecycle) = lifecycle.as_deref_mut() {
            lifecycle.set_phase(PHASE_CONFIRMING).map_err(lifecycle_error)?;
        }
        let confirm_timer = Timer::new();
        self.ledger.confirm(&signature, self.commitment).await?;
        confirm_timer.observe_duration(&metrics().confirm_latency);

        Ok(signature)
    }

    fn acquire(&self) -> Result<scopeguard::ScopeGuard<(), impl FnOnce(()) + '_>, BatchError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BatchError::AlreadyInFlight)?;
        metrics().batches_in_flight.inc();

        Ok(scopeguard::guard((), move |_| {
            self.in_flight.store(false, Ordering::Release);
            metrics().batches_in_flight.dec();
        }))
    }
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("sender", &self.sender())
            .field("commitment", &self.commitment)
            .field("in_flight", &self.is_in_flight())
            .finish_non_exhaustive()
    }
}

fn lifecycle_error(e: crate::lifecycle::LifecycleError) -> BatchError {
    BatchError::internal(format!("lifecycle: {}", e))
}

fn record_outcome(result: Result<&Signature, &BatchError>, logger: &BatchLogger, timer: &Timer) {
    let latency_ms = (timer.elapsed_secs() * 1000.0) as u64;
    match result {
        Ok(signature) => {
            metrics().batches_succeeded.inc();
            timer.observe_duration(&metrics().submit_latency);
            logger.log_success(&signature.to_string(), latency_ms);
        }
        Err(e) => {
            metrics().record_failure(e.category());
            logger.log_failure(
                e.category(),
                &e.to_string(),
                !e.is_pre_broadcast(),
                latency_ms,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockLedgerClient, MockSigner};
    use crate::types::AssetSelection;

    fn executor(ledger: MockLedgerClient, signer: MockSigner) -> BatchExecutor {
        BatchExecutor::new(
            Arc::new(ledger),
            Arc::new(signer),
            KnownAssetRegistry::devnet(),
        )
    }

    #[test]
    fn test_estimate_fee_follows_asset_kind() {
        let exec = executor(MockLedgerClient::new(), MockSigner::new());
        let mut batch = BatchState::with_recipients(
            AssetSelection::Native,
            vec![("a", "1"), ("b", "2"), ("c", "3")],
        );
        assert_eq!(exec.estimate_fee(&batch).lamports, 5_000);

        batch.set_asset(AssetSelection::KnownToken("USDC".into()));
        assert_eq!(exec.estimate_fee(&batch).lamports, 5_000 + 3 * 2_039_280);
    }

    #[test]
    fn test_guard_releases_flag() {
        let exec = executor(MockLedgerClient::new(), MockSigner::new());
        {
            let _guard = exec.acquire().unwrap();
            assert!(exec.is_in_flight());
            assert!(matches!(exec.acquire(), Err(BatchError::AlreadyInFlight)));
        }
        assert!(!exec.is_in_flight());
    }

    #[tokio::test]
    async fn test_native_balance_check() {
        let signer = MockSigner::new();
        let sender = signer.pubkey();
        let exec = executor(MockLedgerClient::new().with_balance(sender, 2_000_000_000), signer);

        let batch = BatchState::with_recipients(
            AssetSelection::Native,
            vec![
                (Pubkey::new_unique().to_string(), "0.5".to_string()),
                (Pubkey::new_unique().to_string(), "1.0".to_string()),
            ],
        );
        let check = exec.check_balance(&batch).await;
        assert_eq!(check.current, Some(2_000_000_000));
        assert_eq!(check.required, 1_500_000_000);
        assert!(check.sufficient);
    }

    #[tokio::test]
    async fn test_balance_unavailable_degrades() {
        let exec = executor(MockLedgerClient::new(), MockSigner::new());
        let batch = BatchState::with_recipients(
            AssetSelection::Native,
            vec![(Pubkey::new_unique().to_string(), "1")],
        );
        let check = exec.check_balance(&batch).await;
        assert_eq!(check.current, None);
        assert_eq!(check.required, 1_000_000_000);
        assert!(!check.sufficient);
    }

    #[tokio::test]
    async fn test_token_balance_reads_sender_account() {
        let signer = MockSigner::new();
        let sender = signer.pubkey();
        let mint = Pubkey::new_unique();
        let ledger = MockLedgerClient::new()
            .with_mint(mint, 6)
            .with_token_balance(associated_account(&sender, &mint), 1_000_000);
        let exec = executor(ledger, signer);

        let batch = BatchState::with_recipients(
            AssetSelection::CustomToken(mint.to_string()),
            vec![(Pubkey::new_unique().to_string(), "2")],
        );
        let check = exec.check_balance(&batch).await;
        assert_eq!(check.current, Some(1_000_000));
        assert_eq!(check.required, 2_000_000);
        assert!(!check.sufficient);
    }
}
