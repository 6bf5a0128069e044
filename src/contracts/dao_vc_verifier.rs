// src/contracts/dao_vc_verifier.rs
//! `DaoVcVerifier` smart contract interface.
//!
//! The contract recomputes the EIP-712 digest from a `DaoVc` struct with
//! Solidity's `abi.encode`/`keccak256` and checks `ecrecover` against the
//! address embedded in `issuer`. [`contract_digest`] performs the same
//! computation off-chain so a credential can be checked for on-chain
//! compatibility before any call is made.

use ethers::abi::{encode, Token};
use ethers::providers::Middleware;
use ethers::types::transaction::eip712::Eip712Error;
use ethers::types::{Address, H256, U256};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::blockchain::ledger_client::LedgerClient;
use crate::eip712::canonicalize::alias_of;
use crate::eip712::digest::DigestError;
use crate::eip712::domain::DomainSeparator;
use crate::eip712::schema::DAO_VC_PRIMARY_TYPE;
use crate::error::{Result, VerificationError};
use crate::models::document::NormalizedDocument;
use crate::models::signature::SignatureParts;
use crate::utils::crypto::{hash_data, hash_str};

const ABI: &[u8] = include_bytes!("../abi/DaoVcVerifier.json");

pub const VERIFY_METHOD: &str = "verifyDaoVc";

pub const EIP712_DOMAIN_TYPE_STRING: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const DAO_TYPE_STRING: &str = "DAO(string name,string category)";

/// `encodeType(DaoVc)`: the primary type followed by its referenced types.
pub const DAO_VC_TYPE_STRING: &str = concat!(
    "DaoVc(string[] _context,string[] _type,string issuer,string issuanceDate,DAO credentialSubject)",
    "DAO(string name,string category)"
);

/// Solidity `struct DAO`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dao {
    pub name: String,
    pub category: String,
}

impl Dao {
    pub fn struct_hash(&self) -> H256 {
        hash_data(&encode(&[
            Token::FixedBytes(hash_str(DAO_TYPE_STRING).as_bytes().to_vec()),
            Token::FixedBytes(hash_str(&self.name).as_bytes().to_vec()),
            Token::FixedBytes(hash_str(&self.category).as_bytes().to_vec()),
        ]))
    }

    fn into_token(self) -> Token {
        Token::Tuple(vec![Token::String(self.name), Token::String(self.category)])
    }
}

/// Solidity `struct DaoVc`, the contract's view of a normalized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaoVc {
    pub context: Vec<String>,
    pub types: Vec<String>,
    pub issuer: String,
    pub issuance_date: String,
    pub credential_subject: Dao,
}

impl DaoVc {
    /// Extracts the contract struct from a normalized document.
    ///
    /// # Errors
    /// `Digest` when a field is absent or has the wrong JSON shape.
    pub fn from_document(document: &NormalizedDocument) -> Result<Self, VerificationError> {
        Ok(Self {
            context: field(document, alias_of("@context"))?,
            types: field(document, alias_of("type"))?,
            issuer: field(document, "issuer")?,
            issuance_date: field(document, "issuanceDate")?,
            credential_subject: field(document, "credentialSubject")?,
        })
    }

    /// `hashStruct(DaoVc)` as the contract computes it.
    pub fn struct_hash(&self) -> H256 {
        hash_data(&encode(&[
            Token::FixedBytes(hash_str(DAO_VC_TYPE_STRING).as_bytes().to_vec()),
            Token::FixedBytes(hash_string_array(&self.context).as_bytes().to_vec()),
            Token::FixedBytes(hash_string_array(&self.types).as_bytes().to_vec()),
            Token::FixedBytes(hash_str(&self.issuer).as_bytes().to_vec()),
            Token::FixedBytes(hash_str(&self.issuance_date).as_bytes().to_vec()),
            Token::FixedBytes(self.credential_subject.struct_hash().as_bytes().to_vec()),
        ]))
    }

    /// ABI tuple `(string[],string[],string,string,(string,string))`.
    pub fn into_token(self) -> Token {
        let strings = |items: Vec<String>| Token::Array(items.into_iter().map(Token::String).collect());
        Token::Tuple(vec![
            strings(self.context),
            strings(self.types),
            Token::String(self.issuer),
            Token::String(self.issuance_date),
            self.credential_subject.into_token(),
        ])
    }
}

fn field<T: DeserializeOwned>(
    document: &NormalizedDocument,
    name: &str,
) -> Result<T, VerificationError> {
    let value = document.get(name).ok_or_else(|| DigestError::MissingField {
        type_name: DAO_VC_PRIMARY_TYPE.to_owned(),
        field: name.to_owned(),
    })?;
    serde_json::from_value(value.clone())
        .map_err(|err| DigestError::from(Eip712Error::from(err)).into())
}

/// `keccak256(abi.encodePacked(keccak256(item)...))`
pub fn hash_string_array(items: &[String]) -> H256 {
    let packed: Vec<u8> = items
        .iter()
        .flat_map(|item| hash_str(item).to_fixed_bytes())
        .collect();
    hash_data(&packed)
}

/// Domain separator as the contract builds it in its constructor.
pub fn domain_separator_hash(domain: &DomainSeparator) -> H256 {
    hash_data(&encode(&[
        Token::FixedBytes(hash_str(EIP712_DOMAIN_TYPE_STRING).as_bytes().to_vec()),
        Token::FixedBytes(hash_str(domain.name()).as_bytes().to_vec()),
        Token::FixedBytes(hash_str(domain.version()).as_bytes().to_vec()),
        Token::Uint(U256::from(domain.chain_id())),
        Token::Address(domain.verifying_contract()),
    ]))
}

/// `keccak256("\x19\x01" || domainSeparator || hashStruct(vc))`
pub fn contract_digest(domain: &DomainSeparator, vc: &DaoVc) -> H256 {
    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(domain_separator_hash(domain).as_bytes());
    preimage.extend_from_slice(vc.struct_hash().as_bytes());
    hash_data(&preimage)
}

/// Result of an on-chain verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnChainVerification {
    pub valid: bool,
    /// Gas the `verifyDaoVc` call is estimated to consume.
    pub gas: U256,
}

/// `DaoVcVerifier` contract deployed at one address.
///
/// # Type Parameters
/// * `M` - middleware the calls go through
pub struct DaoVcVerifierContract<M> {
    ledger: LedgerClient<M>,
    address: Address,
}

impl<M: Middleware + 'static> DaoVcVerifierContract<M> {
    pub fn new(ledger: LedgerClient<M>, address: Address) -> Self {
        Self { ledger, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Domain the deployed contract hashes under.
    pub fn domain(&self, name: &str, chain_id: u64) -> Result<DomainSeparator> {
        Ok(DomainSeparator::neutral(name, chain_id)?.for_contract(self.address))
    }

    /// Calls `verifyDaoVc(vc, v, r, s)`.
    ///
    /// # Errors
    /// `Verification` when the signature components or the document are
    /// malformed (checked before any call), `External` when the node fails.
    pub async fn is_valid(
        &self,
        document: &NormalizedDocument,
        signature: &SignatureParts,
    ) -> Result<bool> {
        let args = call_args(document, signature)?;
        let valid: bool = self
            .ledger
            .query_contract(self.address, ABI, VERIFY_METHOD, args)
            .await?;
        debug!("{VERIFY_METHOD} on {:?} returned {valid}", self.address);
        Ok(valid)
    }

    pub async fn estimate_gas(
        &self,
        document: &NormalizedDocument,
        signature: &SignatureParts,
    ) -> Result<U256> {
        let args = call_args(document, signature)?;
        self.ledger
            .estimate_gas(self.address, ABI, VERIFY_METHOD, args)
            .await
    }

    /// Verifies on-chain and reports the estimated gas alongside.
    pub async fn verify(
        &self,
        document: &NormalizedDocument,
        signature: &SignatureParts,
    ) -> Result<OnChainVerification> {
        let valid = self.is_valid(document, signature).await?;
        let gas = self.estimate_gas(document, signature).await?;
        info!(
            "on-chain verification at {:?}: valid={valid}, gas={gas}",
            self.address
        );
        Ok(OnChainVerification { valid, gas })
    }
}

fn call_args(document: &NormalizedDocument, signature: &SignatureParts) -> Result<Token> {
    signature.validate()?;
    let vc = DaoVc::from_document(document)?;
    Ok(Token::Tuple(vec![
        vc.into_token(),
        Token::Uint(U256::from(signature.electrum_v())),
        Token::FixedBytes(signature.r.as_bytes().to_vec()),
        Token::FixedBytes(signature.s.as_bytes().to_vec()),
    ]))
}
