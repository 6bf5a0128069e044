// src/eip712/domain.rs
//! EIP-712 signing domain.

use ethers::types::transaction::eip712::EIP712Domain;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::crypto::{checksum, parse_address};

/// Domain version every credential is currently signed under.
pub const DOMAIN_VERSION: &str = "1";

/// `{name, version, chainId, verifyingContract}` scoping a signature to one
/// application, chain and verifying contract.
///
/// A zero `verifyingContract` leaves the credential verifiable by any contract
/// on that chain sharing the domain name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DomainRecord", into = "DomainRecord")]
pub struct DomainSeparator {
    name: String,
    version: String,
    chain_id: u64,
    verifying_contract: Address,
}

impl DomainSeparator {
    /// Builds a domain from a textual contract address.
    ///
    /// # Errors
    /// `InvalidChainId` for a zero chain id, `MalformedAddress` when the
    /// verifying contract is not a 20-byte hex address.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: &str,
    ) -> Result<Self, ConfigError> {
        Self::with_address(name, version, chain_id, parse_address(verifying_contract)?)
    }

    pub fn with_address(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Result<Self, ConfigError> {
        if chain_id == 0 {
            return Err(ConfigError::InvalidChainId);
        }
        Ok(Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        })
    }

    /// Version "1" domain with the zero verifying contract.
    pub fn neutral(name: impl Into<String>, chain_id: u64) -> Result<Self, ConfigError> {
        Self::with_address(name, DOMAIN_VERSION, chain_id, Address::zero())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn verifying_contract(&self) -> Address {
        self.verifying_contract
    }

    pub fn is_neutral(&self) -> bool {
        self.verifying_contract.is_zero()
    }

    /// Same domain pinned to another contract.
    pub fn for_contract(&self, verifying_contract: Address) -> Self {
        Self {
            verifying_contract,
            ..self.clone()
        }
    }

    pub fn to_eip712(&self) -> EIP712Domain {
        EIP712Domain {
            name: Some(self.name.clone()),
            version: Some(self.version.clone()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        }
    }

    /// `hashStruct(EIP712Domain)`
    pub fn separator(&self) -> H256 {
        H256::from(self.to_eip712().separator())
    }
}

/// Wire shape of a domain inside `proof.eip712.domain`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainRecord {
    name: String,
    version: String,
    chain_id: u64,
    verifying_contract: String,
}

impl TryFrom<DomainRecord> for DomainSeparator {
    type Error = ConfigError;

    fn try_from(record: DomainRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.name,
            record.version,
            record.chain_id,
            &record.verifying_contract,
        )
    }
}

impl From<DomainSeparator> for DomainRecord {
    fn from(domain: DomainSeparator) -> Self {
        Self {
            verifying_contract: checksum(&domain.verifying_contract),
            name: domain.name,
            version: domain.version,
            chain_id: domain.chain_id,
        }
    }
}
