// src/wallet/key_management.rs
//! Signing key management for the issuer wallet.
//!
//! Loads the secp256k1 issuer key (via the `k256` crate) and exposes it as an
//! ethers [`LocalWallet`], which is the signing identity handed to the
//! credential issuer. Key material never leaves this module and is never
//! logged.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::hex;
use k256::ecdsa::SigningKey;
use std::fmt;

use crate::error::ConfigError;
use crate::models::identity::PkhIdentity;

/// Owns the issuer's signing key.
#[derive(Clone)]
pub struct KeyManager {
    wallet: LocalWallet,
}

impl KeyManager {
    /// Loads a key from its hex encoding.
    ///
    /// # Arguments
    /// * `private_key` - 32-byte hex-encoded private key (with or without 0x prefix)
    ///
    /// # Errors
    /// `InvalidKey` if the input is not hex or is not a valid secp256k1 scalar.
    /// The message never echoes the input.
    pub fn from_private_key(private_key: &str) -> Result<Self, ConfigError> {
        let trimmed = private_key.trim();
        let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .map_err(|_| ConfigError::InvalidKey("not valid hex".to_owned()))?;
        if bytes.len() != 32 {
            return Err(ConfigError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| ConfigError::InvalidKey("not a valid secp256k1 scalar".to_owned()))?;
        Ok(Self {
            wallet: LocalWallet::from(signing_key),
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// The signing identity.
    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    pub fn into_wallet(self) -> LocalWallet {
        self.wallet
    }

    /// `did:pkh` identity of this key on `chain_id`.
    pub fn identity(&self, chain_id: u64) -> Result<PkhIdentity, ConfigError> {
        PkhIdentity::new(chain_id, self.address())
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_load_with_and_without_prefix() {
        let bare = KeyManager::from_private_key(KEY).unwrap();
        let prefixed = KeyManager::from_private_key(&format!("0x{KEY}")).unwrap();

        assert_eq!(bare.address(), ACCOUNT.parse::<Address>().unwrap());
        assert_eq!(bare.address(), prefixed.address());
    }

    #[test]
    fn test_identity_on_chain() {
        let keys = KeyManager::from_private_key(KEY).unwrap();
        assert_eq!(
            keys.identity(137).unwrap().to_string(),
            format!("did:pkh:eip155:137:{ACCOUNT}")
        );
        assert_eq!(keys.identity(0), Err(ConfigError::InvalidChainId));
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        for key in ["", "zz", "0x1234", &"00".repeat(32)] {
            assert!(matches!(
                KeyManager::from_private_key(key),
                Err(ConfigError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_debug_hides_key() {
        let keys = KeyManager::from_private_key(KEY).unwrap();
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains(&KEY[..16]));
    }
}
