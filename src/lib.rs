// src/lib.rs

//! # dao-vc
//!
//! Issues and verifies W3C Verifiable Credentials signed as EIP-712 typed data.
//! A credential is canonicalized, hashed under an EIP-712 domain and signed by
//! an Ethereum account identified as `did:pkh:eip155:<chainId>:<address>`. The
//! signature can be checked off-chain by recovering the signer, or on-chain by
//! the `DaoVcVerifier` contract, which recomputes the same digest.
//!
//! ## Layout
//! 1. **Models**: documents, identities, signature components, the signed envelope
//! 2. **EIP-712**: canonicalization, type schemas, domain and digest
//! 3. **Services**: issuance and off-chain verification
//! 4. **Contracts / Blockchain**: on-chain verifier binding over an RPC client

pub mod blockchain; // EVM JSON-RPC access
pub mod config; // Layered runtime settings
pub mod contracts; // Verifier contract binding
pub mod eip712; // Typed-data canonicalization and hashing
pub mod error; // Stage-tagged error taxonomy
pub mod models; // Data structures
pub mod services; // Issuance and verification
pub mod utils; // Helper functions
pub mod wallet; // Issuer key loading

pub use crate::error::{Error, Result, Stage};
pub use crate::models::credential::SignedCredential;
pub use crate::models::identity::PkhIdentity;
pub use crate::services::credential_issuer::CredentialIssuer;
pub use crate::services::verifier::Verifier;
