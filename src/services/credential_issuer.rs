// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Turns a raw credential document into a signed credential envelope:
//! 1. stamp the document with the issuer's `did:pkh` identity and issuance time
//! 2. canonicalize it (reserved field aliasing)
//! 3. have the signing identity sign the EIP-712 payload
//! 4. split the signature into `(v, r, s)` and assemble the proof block
//!
//! Any ethers [`Signer`] can act as the signing identity: a local key, a
//! hardware wallet or a remote signer. Failures are surfaced as-is; nothing
//! is retried and no other identity is tried.

use chrono::{DateTime, SecondsFormat, Utc};
use ethers::signers::Signer;
use log::{debug, info};
use std::sync::Arc;

use crate::eip712::canonicalize::canonicalize;
use crate::eip712::digest::typed_data;
use crate::eip712::domain::DomainSeparator;
use crate::eip712::schema::TypeSchema;
use crate::error::{Result, SigningError};
use crate::models::credential::{Eip712Context, Proof, SignedCredential, PROOF_PURPOSE, PROOF_TYPE};
use crate::models::document::{NormalizedDocument, RawDocument};
use crate::models::identity::PkhIdentity;
use crate::models::signature::SignatureParts;

/// Signature over a normalized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSignature {
    pub parts: SignatureParts,
    /// `r || s || v`
    pub full_signature: [u8; 65],
}

/// Signs `document` under `domain` and `schema` with `signer`.
///
/// # Errors
/// `Signing` when the document lacks a field the schema declares, when the
/// identity fails to sign, or when it returns unusable components.
pub async fn sign_document<S: Signer>(
    signer: &S,
    domain: &DomainSeparator,
    schema: &TypeSchema,
    document: &NormalizedDocument,
) -> Result<DocumentSignature> {
    let payload = typed_data(domain, schema, document).map_err(SigningError::from)?;

    let signature = signer
        .sign_typed_data(&payload)
        .await
        .map_err(|err| SigningError::Identity(err.to_string()))?;

    let parts = SignatureParts::from_signature(&signature)
        .map_err(|err| SigningError::MalformedOutput(err.to_string()))?;
    debug!(
        "{} signature by {:?}: v={} r={:?}",
        schema.primary_type(),
        signer.address(),
        parts.v,
        parts.r
    );

    Ok(DocumentSignature {
        full_signature: parts.to_bytes(),
        parts,
    })
}

/// `Date.toISOString()` layout: millisecond precision, `Z` suffix.
pub fn issuance_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Issues credentials of one schema under one domain with one identity.
pub struct CredentialIssuer<S> {
    signer: S,
    domain: DomainSeparator,
    schema: Arc<TypeSchema>,
}

impl<S: Signer> CredentialIssuer<S> {
    pub fn new(signer: S, domain: DomainSeparator, schema: Arc<TypeSchema>) -> Self {
        Self {
            signer,
            domain,
            schema,
        }
    }

    pub fn domain(&self) -> &DomainSeparator {
        &self.domain
    }

    pub fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    /// `did:pkh` identity of the signer on the domain's chain.
    pub fn identity(&self) -> Result<PkhIdentity> {
        Ok(PkhIdentity::new(
            self.domain.chain_id(),
            self.signer.address(),
        )?)
    }

    /// Issues a credential stamped with the current time.
    pub async fn issue(&self, document: &RawDocument) -> Result<SignedCredential> {
        self.issue_at(document, Utc::now()).await
    }

    /// Issues a credential stamped with `issued_at`.
    pub async fn issue_at(
        &self,
        document: &RawDocument,
        issued_at: DateTime<Utc>,
    ) -> Result<SignedCredential> {
        let issuer = self.identity()?;
        let issuance_date = issuance_timestamp(issued_at);
        let normalized = canonicalize(document, &issuer, &issuance_date)?;

        info!(
            "Issuing {} v{} credential for {} on chain {}",
            self.schema.kind(),
            self.schema.version(),
            issuer,
            self.domain.chain_id()
        );
        let signature = sign_document(&self.signer, &self.domain, &self.schema, &normalized).await?;

        Ok(SignedCredential {
            document: normalized,
            proof: Proof {
                created: issuance_date,
                eip712: Eip712Context {
                    domain: self.domain.clone(),
                    primary_type: self.schema.primary_type().to_owned(),
                    types: self.schema.types().clone(),
                },
                proof_purpose: PROOF_PURPOSE.to_owned(),
                proof_value: signature.parts,
                proof_type: PROOF_TYPE.to_owned(),
                verification_method: issuer.verification_method(),
            },
        })
    }
}
