//! Sender wallet loading

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::Path;
use std::sync::Arc;

const KEYPAIR_BYTES: usize = 64;

/// The sender's keypair, shared between the signer and the CLI
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    /// Load a keypair file, either raw 64 bytes or the JSON byte array
    /// written by `solana-keygen`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

        let secret = if bytes.len() == KEYPAIR_BYTES {
            bytes
        } else {
            serde_json::from_slice::<Vec<u8>>(&bytes).context("Failed to parse keypair JSON")?
        };

        Self::from_bytes(&secret)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYPAIR_BYTES {
            anyhow::bail!(
                "Invalid keypair length: expected {} bytes, got {}",
                KEYPAIR_BYTES,
                bytes.len()
            );
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_json_keypair_file() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let wallet = Wallet::from_file(file.path()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_loads_raw_keypair_file() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&keypair.to_bytes()).unwrap();

        let wallet = Wallet::from_file(file.path()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_zero_and_short_keys() {
        assert!(Wallet::from_bytes(&[0u8; 64]).is_err());
        assert!(Wallet::from_bytes(&[1u8; 32]).is_err());
        assert!(Wallet::from_file("/nonexistent/keypair.json").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let wallet = Wallet::from_keypair(Keypair::new());
        let rendered = format!("{:?}", wallet);
        assert!(rendered.contains(&wallet.pubkey().to_string()));
        assert!(!rendered.contains("secret"));
    }
}
