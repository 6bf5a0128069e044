// src/models/identity.rs
//! `did:pkh` identifiers for blockchain accounts.
//!
//! A `did:pkh` identifier encodes an account address directly, scoped by a
//! CAIP-2 chain namespace and reference:
//! ```text
//! did:pkh:eip155:<chainId>:<address>
//! ```
//! The same identifier is used as the credential `issuer` and, with the
//! `#blockchainAccountId` fragment, as the proof's `verificationMethod`.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::utils::crypto::{checksum, parse_address};

/// The only DID method this system resolves.
pub const DID_METHOD: &str = "pkh";

/// CAIP-2 namespace for EVM chains.
pub const CHAIN_NAMESPACE: &str = "eip155";

/// Fragment appended to the issuer to form the verification method.
pub const VERIFICATION_METHOD_FRAGMENT: &str = "#blockchainAccountId";

/// An EVM account identified as `did:pkh:eip155:<chainId>:<address>`.
///
/// Displayed with the EIP-55 checksummed address. Parsing accepts checksummed
/// or lowercase hex, and two identities compare equal when chain and account
/// match regardless of the case they were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PkhIdentity {
    chain_id: u64,
    address: Address,
}

impl PkhIdentity {
    pub fn new(chain_id: u64, address: Address) -> Result<Self, ConfigError> {
        if chain_id == 0 {
            return Err(ConfigError::InvalidChainId);
        }
        Ok(Self { chain_id, address })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// `<did>#blockchainAccountId`
    pub fn verification_method(&self) -> String {
        format!("{self}{VERIFICATION_METHOD_FRAGMENT}")
    }
}

impl fmt::Display for PkhIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did:{DID_METHOD}:{CHAIN_NAMESPACE}:{}:{}",
            self.chain_id,
            checksum(&self.address)
        )
    }
}

impl FromStr for PkhIdentity {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedIdentity(value.to_owned());

        let parts: Vec<&str> = value.split(':').collect();
        let [scheme, method, namespace, reference, account] = parts.as_slice() else {
            return Err(malformed());
        };
        if *scheme != "did" || *method != DID_METHOD || *namespace != CHAIN_NAMESPACE {
            return Err(malformed());
        }

        let chain_id: u64 = reference.parse().map_err(|_| malformed())?;
        let address = parse_address(account).map_err(|_| malformed())?;
        Self::new(chain_id, address).map_err(|_| malformed())
    }
}

impl TryFrom<String> for PkhIdentity {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PkhIdentity> for String {
    fn from(identity: PkhIdentity) -> Self {
        identity.to_string()
    }
}
