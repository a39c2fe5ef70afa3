//! Compiled batch message ready for signing
//!
//! Holds the v0 message together with the facts the executor checks before
//! handing it to the signer: who must sign and how large the signed
//! transaction will be on the wire.

use solana_sdk::{
    message::VersionedMessage, packet::PACKET_DATA_SIZE, pubkey::Pubkey, signature::SIGNATURE_BYTES,
};

#[derive(Debug, Clone)]
pub struct TxBuildOutput {
    /// Message to sign and broadcast
    pub message: VersionedMessage,

    /// First `num_required_signatures` static account keys
    pub required_signers: Vec<Pubkey>,

    /// Size of the signed transaction in bytes
    pub serialized_size: usize,
}

impl TxBuildOutput {
    pub fn new(message: VersionedMessage) -> Self {
        let required_signers = required_signers(&message).to_vec();
        let serialized_size = signed_size(&message);
        Self {
            message,
            required_signers,
            serialized_size,
        }
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }

    /// True when the signed transaction does not fit one network packet
    pub fn exceeds_packet_limit(&self) -> bool {
        self.serialized_size > PACKET_DATA_SIZE
    }

    pub fn into_message(self) -> VersionedMessage {
        self.message
    }
}

fn required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let keys = message.static_account_keys();
    let num_signers = message.header().num_required_signatures as usize;
    &keys[..num_signers.min(keys.len())]
}

/// Signature count prefix (compact-u16) + signatures + message
fn signed_size(message: &VersionedMessage) -> usize {
    let signatures = message.header().num_required_signatures as usize;
    let prefix = if signatures < 0x80 { 1 } else { 2 };
    prefix + signatures * SIGNATURE_BYTES + message.serialize().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::v0,
        system_instruction,
    };

    #[allow(deprecated)]
    fn native_message(payer: &Pubkey, recipients: usize) -> VersionedMessage {
        let ixs: Vec<_> = (0..recipients)
            .map(|_| system_instruction::transfer(payer, &Pubkey::new_unique(), 1))
            .collect();
        VersionedMessage::V0(v0::Message::try_compile(payer, &ixs, &[], Hash::new_unique()).unwrap())
    }

    #[test]
    fn test_fee_payer_is_only_signer() {
        let payer = Pubkey::new_unique();
        let output = TxBuildOutput::new(native_message(&payer, 3));
        assert_eq!(output.required_signers(), &[payer]);
    }

    #[test]
    fn test_size_grows_with_recipients() {
        let payer = Pubkey::new_unique();
        let small = TxBuildOutput::new(native_message(&payer, 1));
        let larger = TxBuildOutput::new(native_message(&payer, 2));

        // One more account key and one more compiled instruction
        assert!(larger.serialized_size > small.serialized_size + 32);
        assert!(!larger.exceeds_packet_limit());
    }

    #[test]
    fn test_large_batch_exceeds_packet() {
        let payer = Pubkey::new_unique();
        let output = TxBuildOutput::new(native_message(&payer, 40));
        assert!(output.exceeds_packet_limit());
    }
}
