//! Configuration module
//!
//! Loads settings from a TOML file, a `.env` file and environment variable
//! overrides, and turns them into the runtime types the executor needs.

use crate::fees::{FeeEstimator, BASE_SIGNATURE_FEE_LAMPORTS, TOKEN_ACCOUNT_RENT_LAMPORTS};
use crate::ledger::ConfirmPolicy;
use crate::types::{KnownAssetRegistry, DEVNET_USDC_MINT, DEVNET_USDT_MINT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const ENV_RPC_URL: &str = "MULTISEND_RPC_URL";
pub const ENV_KEYPAIR: &str = "MULTISEND_KEYPAIR";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub fees: FeesConfig,

    /// Token symbol to mint address
    #[serde(default = "default_assets")]
    pub assets: BTreeMap<String, String>,

    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_confirm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeesConfig {
    #[serde(default = "default_base_fee")]
    pub base_fee_lamports: u64,

    #[serde(default = "default_account_rent")]
    pub token_account_rent_lamports: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_confirm_timeout() -> u64 { 60 }
fn default_poll_interval() -> u64 { 500 }
fn default_base_fee() -> u64 { BASE_SIGNATURE_FEE_LAMPORTS }
fn default_account_rent() -> u64 { TOKEN_ACCOUNT_RENT_LAMPORTS }
fn default_true() -> bool { true }

fn default_assets() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("USDC".to_string(), DEVNET_USDC_MINT.to_string()),
        ("USDT".to_string(), DEVNET_USDT_MINT.to_string()),
    ])
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            base_fee_lamports: default_base_fee(),
            token_account_rent_lamports: default_account_rent(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            wallet: WalletConfig::default(),
            confirmation: ConfirmationConfig::default(),
            fees: FeesConfig::default(),
            assets: default_assets(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `.env`, the config file if present, then environment overrides,
    /// and validate the result
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(
            std::env::var(ENV_RPC_URL).ok(),
            std::env::var(ENV_KEYPAIR).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, rpc_url: Option<String>, keypair_path: Option<String>) {
        if let Some(url) = rpc_url.filter(|u| !u.trim().is_empty()) {
            self.rpc.url = url;
        }
        if let Some(path) = keypair_path.filter(|p| !p.trim().is_empty()) {
            self.wallet.keypair_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.rpc.timeout_secs == 0 {
            anyhow::bail!("rpc.timeout_secs must be greater than zero");
        }
        if self.confirmation.timeout_secs == 0 {
            anyhow::bail!("confirmation.timeout_secs must be greater than zero");
        }
        if self.confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be greater than zero");
        }
        self.commitment()?;
        self.asset_registry()?;
        Ok(())
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        match self.rpc.commitment.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => anyhow::bail!("unknown rpc.commitment '{}'", other),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn confirm_policy(&self) -> ConfirmPolicy {
        ConfirmPolicy {
            timeout: Duration::from_secs(self.confirmation.timeout_secs),
            poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms),
        }
    }

    pub fn fee_estimator(&self) -> FeeEstimator {
        FeeEstimator::new(
            self.fees.base_fee_lamports,
            self.fees.token_account_rent_lamports,
        )
    }

    pub fn asset_registry(&self) -> Result<KnownAssetRegistry> {
        KnownAssetRegistry::from_strings(
            self.assets
                .iter()
                .map(|(symbol, mint)| (symbol.as_str(), mint.as_str())),
        )
        .context("Invalid [assets] table")
    }

    /// Keypair path with a leading `~` expanded from `$HOME`
    pub fn keypair_path(&self) -> PathBuf {
        expand_home(&self.wallet.keypair_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
