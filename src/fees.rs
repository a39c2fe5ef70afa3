//! Advisory network cost estimation
//!
//! The estimate never gates submission. It assumes every recipient of a
//! token batch may need an associated token account, because the estimator
//! does not query the ledger.

use serde::Serialize;
use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Fee for the single fee-payer signature
pub const BASE_SIGNATURE_FEE_LAMPORTS: u64 = 5_000;

/// Rent-exempt minimum of a 165-byte token account
pub const TOKEN_ACCOUNT_RENT_LAMPORTS: u64 = 2_039_280;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
    pub lamports: u64,
}

impl FeeEstimate {
    pub fn as_sol(&self) -> f64 {
        self.lamports as f64 / LAMPORTS_PER_SOL as f64
    }
}

impl std::fmt::Display for FeeEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "~{:.6} SOL", self.as_sol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimator {
    pub base_fee_lamports: u64,
    pub token_account_rent_lamports: u64,
}

impl FeeEstimator {
    pub fn new(base_fee_lamports: u64, token_account_rent_lamports: u64) -> Self {
        Self {
            base_fee_lamports,
            token_account_rent_lamports,
        }
    }

    pub fn estimate(&self, recipient_count: usize, is_token: bool) -> FeeEstimate {
        let rent = if is_token {
            self.token_account_rent_lamports
                .saturating_mul(recipient_count as u64)
        } else {
            0
        };
        FeeEstimate {
            lamports: self.base_fee_lamports.saturating_add(rent),
        }
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(BASE_SIGNATURE_FEE_LAMPORTS, TOKEN_ACCOUNT_RENT_LAMPORTS)
    }
}

/// Estimate with the default fee schedule
pub fn estimate_fee(recipient_count: usize, is_token: bool) -> FeeEstimate {
    FeeEstimator::default().estimate(recipient_count, is_token)
}
