// src/error.rs
//! Error taxonomy for credential issuance and verification.
//!
//! Every failure is tagged with the stage that produced it, so a caller can tell
//! "verification ran and the signature did not match" (an `Ok(false)`) apart from
//! "verification could not run" (an [`Error::Verification`]).

use std::fmt;
use thiserror::Error;

use crate::eip712::digest::DigestError;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Pipeline stage that produced an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configuration,
    Canonicalization,
    Signing,
    Verification,
    External,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Canonicalization => "canonicalization",
            Stage::Signing => "signing",
            Stage::Verification => "verification",
            Stage::External => "external call",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("verification error: {0}")]
    Verification(#[from] VerificationError),

    /// Ledger or RPC failure, message carried through unmodified.
    #[error("external call failed: {0}")]
    External(String),
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Configuration(_) => Stage::Configuration,
            Error::Canonicalization(_) => Stage::Canonicalization,
            Error::Signing(_) => Stage::Signing,
            Error::Verification(_) => Stage::Verification,
            Error::External(_) => Stage::External,
        }
    }

    /// True when the signature components themselves were unusable.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, Error::Verification(VerificationError::InvalidSignature(_)))
    }
}

/// Raised before any signing or verification is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chain id must be a positive integer")]
    InvalidChainId,

    #[error("malformed account address `{0}`")]
    MalformedAddress(String),

    #[error("malformed identity `{0}`")]
    MalformedIdentity(String),

    #[error("no type schema registered for kind `{0}`")]
    SchemaNotFound(String),

    #[error("type schema `{0}` is already registered")]
    DuplicateSchema(String),

    #[error("type schema `{kind}` is invalid: {reason}")]
    InvalidSchema { kind: String, reason: String },

    #[error("missing setting `{0}`")]
    MissingSetting(&'static str),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("{0}")]
    Settings(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Settings(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonicalizationError {
    #[error("alias `{alias}` for reserved field `{field}` collides with an existing field")]
    AliasCollision {
        field: &'static str,
        alias: &'static str,
    },

    #[error("document must be a JSON object")]
    NotAnObject,

    #[error("document has an unexpected shape: {0}")]
    Shape(String),
}

impl From<serde_json::Error> for CanonicalizationError {
    fn from(err: serde_json::Error) -> Self {
        CanonicalizationError::Shape(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// The signing identity refused or failed; the cause is kept verbatim.
    #[error("signing identity failed: {0}")]
    Identity(String),

    #[error("signing identity returned a malformed signature: {0}")]
    MalformedOutput(String),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("credential types do not match the trusted `{0}` schema")]
    SchemaMismatch(String),

    /// The types carried in `proof.eip712` do not form a usable schema.
    #[error("embedded credential types are invalid: {0}")]
    InvalidEmbeddedTypes(#[source] ConfigError),

    #[error("malformed issuer identity: {0}")]
    MalformedIssuer(String),
}
