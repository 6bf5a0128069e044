// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all operations and
//! renders account addresses the way wallets and contracts agree on them.

use ethers::types::{Address, H256};
use ethers::utils::{hex, keccak256, to_checksum};

use crate::error::ConfigError;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// The 32-byte hash as an `H256`.
pub fn hash_data(data: &[u8]) -> H256 {
    H256::from(keccak256(data))
}

/// Keccak-256 of a UTF-8 string, as Solidity's `keccak256(bytes(s))`.
pub fn hash_str(value: &str) -> H256 {
    hash_data(value.as_bytes())
}

/// Parses a 20-byte hex account address.
///
/// Accepts lowercase, uppercase or EIP-55 checksummed hex, with or without
/// the `0x` prefix. A mixed-case string must carry a valid checksum.
pub fn parse_address(value: &str) -> Result<Address, ConfigError> {
    let malformed = || ConfigError::MalformedAddress(value.to_owned());
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.len() != 40 {
        return Err(malformed());
    }
    let bytes = hex::decode(digits).map_err(|_| malformed())?;
    let address = Address::from_slice(&bytes);

    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&address, None)[2..] != *digits {
        return Err(malformed());
    }

    Ok(address)
}

/// EIP-55 checksummed rendering of an address.
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "0xAED7EA8035eEc47E657B34eF5D020c7005487443";

    #[test]
    fn test_hash_data_matches_empty_keccak() {
        assert_eq!(
            format!("{:x}", hash_data(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_parse_address_accepts_checksummed_and_lowercase() {
        let checksummed = parse_address(ACCOUNT).unwrap();
        let lowercase = parse_address(&ACCOUNT.to_lowercase()).unwrap();
        let bare = parse_address(&ACCOUNT[2..]).unwrap();

        assert_eq!(checksummed, lowercase);
        assert_eq!(checksummed, bare);
        assert_eq!(checksum(&checksummed), ACCOUNT);
    }

    #[test]
    fn test_parse_address_rejects_bad_checksum() {
        // flip the case of one letter
        let tampered = ACCOUNT.replacen("AED7", "aED7", 1);
        assert!(matches!(
            parse_address(&tampered),
            Err(ConfigError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_parse_address_rejects_wrong_length_and_non_hex() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xZZD7EA8035eEc47E657B34eF5D020c7005487443").is_err());
        assert!(parse_address("").is_err());
    }
}
