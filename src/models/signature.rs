// src/models/signature.rs
//! ECDSA signature components as carried in `proof.proofValue`.

use ethers::types::{Address, RecoveryMessage, Signature, H256, U256};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::VerificationError;

/// secp256k1 group order `n`.
static CURVE_ORDER: Lazy<U256> = Lazy::new(|| {
    U256::from_str_radix(
        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
        16,
    )
    .unwrap_or_default()
});

/// `n / 2`; larger `s` values are malleable duplicates.
static HALF_CURVE_ORDER: Lazy<U256> = Lazy::new(|| *CURVE_ORDER / U256::from(2));

/// `(v, r, s)` split out of a 65-byte `r || s || v` signature.
///
/// `v` is 27 or 28, or an EIP-155 chain-offset value (`chainId * 2 + 35/36`).
/// Deserialized values are unchecked until [`SignatureParts::validate`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureParts {
    pub v: u64,
    pub r: H256,
    pub s: H256,
}

impl SignatureParts {
    pub fn new(v: u64, r: H256, s: H256) -> Result<Self, VerificationError> {
        let parts = Self { v, r, s };
        parts.validate()?;
        Ok(parts)
    }

    /// Splits a 65-byte signature, mapping a bare recovery id (0/1) to 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerificationError> {
        if bytes.len() != 65 {
            return Err(VerificationError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let v = match bytes[64] {
            v @ (0 | 1) => u64::from(v) + 27,
            v => u64::from(v),
        };
        Self::new(
            v,
            H256::from_slice(&bytes[..32]),
            H256::from_slice(&bytes[32..64]),
        )
    }

    pub fn from_signature(signature: &Signature) -> Result<Self, VerificationError> {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        signature.r.to_big_endian(&mut r);
        signature.s.to_big_endian(&mut s);
        Self::new(signature.v, H256::from(r), H256::from(s))
    }

    /// Rejects components no honest signer produces: an unknown `v`, a zero or
    /// out-of-range `r`, and a zero or high `s`.
    pub fn validate(&self) -> Result<(), VerificationError> {
        let invalid = |reason: &str| Err(VerificationError::InvalidSignature(reason.to_owned()));

        if !matches!(self.v, 27 | 28 | 35..) {
            return Err(VerificationError::InvalidSignature(format!(
                "v = {} is not 27, 28 or an EIP-155 value",
                self.v
            )));
        }
        let r = U256::from_big_endian(self.r.as_bytes());
        let s = U256::from_big_endian(self.s.as_bytes());
        if r.is_zero() || r >= *CURVE_ORDER {
            return invalid("r is outside the curve order");
        }
        if s.is_zero() || s > *HALF_CURVE_ORDER {
            return invalid("s is zero or in the upper half of the curve order");
        }
        Ok(())
    }

    /// 0 or 1.
    pub fn recovery_id(&self) -> u8 {
        match self.v {
            27 | 28 => (self.v - 27) as u8,
            v => ((v - 35) % 2) as u8,
        }
    }

    /// `v` as Solidity's `ecrecover` takes it.
    pub fn electrum_v(&self) -> u8 {
        self.recovery_id() + 27
    }

    /// `r || s || v`, with `v` in 27/28 form.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_bytes());
        bytes[32..64].copy_from_slice(self.s.as_bytes());
        bytes[64] = self.electrum_v();
        bytes
    }

    pub fn to_signature(&self) -> Signature {
        Signature {
            r: U256::from_big_endian(self.r.as_bytes()),
            s: U256::from_big_endian(self.s.as_bytes()),
            v: u64::from(self.electrum_v()),
        }
    }

    /// Recovers the signing account for a 32-byte digest.
    pub fn recover(&self, digest: H256) -> Result<Address, VerificationError> {
        self.validate()?;
        self.to_signature()
            .recover(RecoveryMessage::Hash(digest))
            .map_err(|err| VerificationError::InvalidSignature(err.to_string()))
    }
}
