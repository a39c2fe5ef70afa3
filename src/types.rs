//! Common types used throughout the crate

use crate::amount::DecimalAmount;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Symbol shown for the native asset
pub const NATIVE_SYMBOL: &str = "SOL";

/// Devnet USDC mint
pub const DEVNET_USDC_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// Devnet USDT mint
pub const DEVNET_USDT_MINT: &str = "DAwBSXe6w9g37wdE2tCrFbho3QHKZi4PjuBytQCULap2";

/// One row of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Stable identifier, unique within the batch
    pub id: String,

    /// Base58 account identifier as entered
    pub address: String,

    /// Decimal amount as entered
    pub amount: String,
}

impl Recipient {
    /// Create an empty recipient with a fresh id
    pub fn empty() -> Self {
        Self::new(String::new(), String::new())
    }

    pub fn new(address: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            address: address.into(),
            amount: amount.into(),
        }
    }
}

/// Field of a recipient that can be edited in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientUpdate {
    Address,
    Amount,
}

/// Asset being sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AssetSelection {
    /// Native SOL
    Native,
    /// A registered token referenced by symbol (e.g. "USDC")
    KnownToken(String),
    /// Any SPL mint supplied by the caller
    CustomToken(String),
}

impl AssetSelection {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Label used in summaries
    pub fn display_symbol(&self) -> String {
        match self {
            Self::Native => NATIVE_SYMBOL.to_string(),
            Self::KnownToken(symbol) => symbol.clone(),
            Self::CustomToken(mint) => mint.trim().to_string(),
        }
    }

    /// Parse a CLI-style selector: "SOL", a registered symbol, or a mint address
    pub fn from_selector(selector: &str, registry: &KnownAssetRegistry) -> Self {
        let selector = selector.trim();
        if selector.eq_ignore_ascii_case(NATIVE_SYMBOL) {
            Self::Native
        } else if let Some(symbol) = registry.canonical_symbol(selector) {
            Self::KnownToken(symbol.to_string())
        } else {
            Self::CustomToken(selector.to_string())
        }
    }
}

impl Default for AssetSelection {
    fn default() -> Self {
        Self::Native
    }
}

/// Static mapping from token symbols to mint addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownAssetRegistry {
    mints: BTreeMap<String, Pubkey>,
}

impl KnownAssetRegistry {
    pub fn new(mints: BTreeMap<String, Pubkey>) -> Self {
        let mints = mints
            .into_iter()
            .map(|(symbol, mint)| (symbol.to_ascii_uppercase(), mint))
            .collect();
        Self { mints }
    }

    /// Build from textual symbol/mint pairs, failing on the first bad mint
    pub fn from_strings<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> anyhow::Result<Self> {
        let mut mints = BTreeMap::new();
        for (symbol, mint) in entries {
            let mint = Pubkey::from_str(mint)
                .map_err(|e| anyhow::anyhow!("invalid mint for {}: {}", symbol, e))?;
            mints.insert(symbol.to_string(), mint);
        }
        Ok(Self::new(mints))
    }

    /// Devnet USDC and USDT
    pub fn devnet() -> Self {
        let mut mints = BTreeMap::new();
        // Constants are valid base58 pubkeys
        if let Ok(usdc) = Pubkey::from_str(DEVNET_USDC_MINT) {
            mints.insert("USDC".to_string(), usdc);
        }
        if let Ok(usdt) = Pubkey::from_str(DEVNET_USDT_MINT) {
            mints.insert("USDT".to_string(), usdt);
        }
        Self::new(mints)
    }

    pub fn mint_for(&self, symbol: &str) -> Option<Pubkey> {
        self.mints.get(&symbol.to_ascii_uppercase()).copied()
    }

    fn canonical_symbol(&self, symbol: &str) -> Option<&str> {
        self.mints
            .get_key_value(&symbol.to_ascii_uppercase())
            .map(|(k, _)| k.as_str())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.mints.keys().map(String::as_str)
    }
}

impl Default for KnownAssetRegistry {
    fn default() -> Self {
        Self::devnet()
    }
}

/// Caller-owned editing state of one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchState {
    pub recipients: Vec<Recipient>,
    pub asset: AssetSelection,
    total_amount: String,
}

impl BatchState {
    pub fn new() -> Self {
        Self {
            recipients: vec![Recipient::empty()],
            asset: AssetSelection::Native,
            total_amount: "0".to_string(),
        }
    }

    /// Start from a list of (address, amount) pairs
    pub fn with_recipients<A, M>(
        asset: AssetSelection,
        rows: impl IntoIterator<Item = (A, M)>,
    ) -> Self
    where
        A: Into<String>,
        M: Into<String>,
    {
        let mut state = Self::new();
        state.asset = asset;
        state.import_recipients(rows);
        state
    }

    pub fn set_asset(&mut self, asset: AssetSelection) {
        self.asset = asset;
    }

    /// Append an empty recipient and return its id
    pub fn add_recipient(&mut self) -> String {
        let recipient = Recipient::empty();
        let id = recipient.id.clone();
        self.recipients.push(recipient);
        id
    }

    /// Remove a recipient; the last remaining one is never removed
    pub fn remove_recipient(&mut self, id: &str) -> bool {
        if self.recipients.len() <= 1 {
            return false;
        }
        let before = self.recipients.len();
        self.recipients.retain(|r| r.id != id);
        self.recipients.len() != before
    }

    pub fn update_recipient(&mut self, id: &str, field: RecipientUpdate, value: &str) -> bool {
        match self.recipients.iter_mut().find(|r| r.id == id) {
            Some(recipient) => {
                match field {
                    RecipientUpdate::Address => recipient.address = value.to_string(),
                    RecipientUpdate::Amount => recipient.amount = value.to_string(),
                }
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        self.recipients = vec![Recipient::empty()];
    }

    /// Replace all recipients with imported rows, assigning fresh ids
    pub fn import_recipients<A, M>(&mut self, rows: impl IntoIterator<Item = (A, M)>)
    where
        A: Into<String>,
        M: Into<String>,
    {
        let imported: Vec<Recipient> = rows
            .into_iter()
            .map(|(address, amount)| Recipient::new(address, amount))
            .collect();

        self.recipients = if imported.is_empty() {
            vec![Recipient::empty()]
        } else {
            imported
        };
    }

    /// Sum of all amounts; unparseable amounts count as zero
    pub fn calculate_total(&mut self) -> &str {
        let total: f64 = self
            .recipients
            .iter()
            .filter_map(|r| DecimalAmount::parse(&r.amount).ok())
            .map(|a| a.to_f64())
            .sum();
        self.total_amount = format!("{:.6}", total);
        &self.total_amount
    }

    /// Last value computed by `calculate_total`
    pub fn total_amount(&self) -> &str {
        &self.total_amount
    }

    /// Split the current total evenly across all recipients
    pub fn set_equal_amounts(&mut self) {
        let total = match DecimalAmount::parse_positive(&self.total_amount) {
            Ok(total) => total.to_f64(),
            Err(_) => return,
        };
        if self.recipients.is_empty() {
            return;
        }
        let share = format!("{:.6}", total / self.recipients.len() as f64);
        for recipient in &mut self.recipients {
            recipient.amount = share.clone();
        }
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new()
    }
}
