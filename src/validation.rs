//! Recipient validation
//!
//! Address and amount checks run before planning. They never fail loudly:
//! callers get booleans or a list of per-field problems to show next to the
//! offending input.

use crate::amount::DecimalAmount;
use crate::types::Recipient;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

const PUBKEY_BYTES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address is not valid base58")]
    InvalidEncoding,

    #[error("address decodes to {len} bytes, expected 32")]
    WrongLength { len: usize },
}

/// Decode an account identifier. Whitespace is not trimmed.
pub fn parse_address(address: &str) -> Result<Pubkey, AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| AddressError::InvalidEncoding)?;
    let bytes: [u8; PUBKEY_BYTES] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AddressError::WrongLength { len: bytes.len() })?;

    Ok(Pubkey::new_from_array(bytes))
}

pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

pub fn is_valid_amount(amount: &str) -> bool {
    DecimalAmount::parse_positive(amount).is_ok()
}

/// Which input of a recipient a problem refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientField {
    Address,
    Amount,
}

/// One problem with one recipient input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub index: usize,
    pub recipient_id: String,
    pub field: RecipientField,
    pub message: String,
}

/// Result of validating a whole batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchValidation {
    pub recipient_count: usize,
    pub errors: Vec<FieldError>,
}

impl BatchValidation {
    pub fn is_valid(&self) -> bool {
        self.recipient_count > 0 && self.errors.is_empty()
    }

    /// Problems for a single recipient, in field order
    pub fn errors_for(&self, recipient_id: &str) -> impl Iterator<Item = &FieldError> {
        let id = recipient_id.to_string();
        self.errors.iter().filter(move |e| e.recipient_id == id)
    }
}

/// Validate every recipient and collect per-field problems
pub fn validate_recipients(recipients: &[Recipient]) -> BatchValidation {
    let mut errors = Vec::new();

    for (index, recipient) in recipients.iter().enumerate() {
        let mut push = |field, message: String| {
            errors.push(FieldError {
                index,
                recipient_id: recipient.id.clone(),
                field,
                message,
            })
        };

        if recipient.address.trim().is_empty() {
            push(RecipientField::Address, AddressError::Empty.to_string());
        } else if let Err(e) = parse_address(&recipient.address) {
            push(RecipientField::Address, e.to_string());
        }

        if let Err(e) = DecimalAmount::parse_positive(&recipient.amount) {
            push(RecipientField::Amount, e.to_string());
        }
    }

    BatchValidation {
        recipient_count: recipients.len(),
        errors,
    }
}

/// True when the batch is non-empty and every recipient has a valid address
/// and a strictly positive amount
pub fn validate_batch(recipients: &[Recipient]) -> bool {
    !recipients.is_empty()
        && recipients
            .iter()
            .all(|r| is_valid_address(&r.address) && is_valid_amount(&r.amount))
}
