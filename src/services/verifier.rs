// src/services/verifier.rs
//! Off-chain credential verification.
//!
//! Recomputes the EIP-712 digest the issuer signed, recovers the signing
//! account from `(v, r, s)` and compares it with the issuer identity.
//!
//! Outcomes stay distinguishable:
//! - `Ok(true)`  - the signature recovers to the issuer
//! - `Ok(false)` - verification ran, the signature belongs to someone else
//! - `Err(_)`    - verification could not run (malformed signature, schema
//!   mismatch, unparseable issuer)

use ethers::types::Address;
use log::{debug, warn};
use std::sync::Arc;

use crate::eip712::digest::digest;
use crate::eip712::domain::DomainSeparator;
use crate::eip712::schema::{TypeSchema, EIP712_DOMAIN_TYPE};
use crate::error::{ConfigError, Result, VerificationError};
use crate::models::credential::SignedCredential;
use crate::models::document::NormalizedDocument;
use crate::models::identity::PkhIdentity;
use crate::models::signature::SignatureParts;

/// Recovers the account that signed `document` under `domain` and `schema`.
pub fn recover_signer(
    domain: &DomainSeparator,
    schema: &TypeSchema,
    document: &NormalizedDocument,
    signature: &SignatureParts,
) -> Result<Address> {
    signature.validate()?;
    let hash = digest(domain, schema, document).map_err(VerificationError::from)?;
    Ok(signature.recover(hash)?)
}

/// True iff `signature` over `document` recovers to `expected_issuer`'s account.
pub fn verify_document(
    domain: &DomainSeparator,
    schema: &TypeSchema,
    document: &NormalizedDocument,
    signature: &SignatureParts,
    expected_issuer: &PkhIdentity,
) -> Result<bool> {
    let recovered = recover_signer(domain, schema, document, signature)?;
    let valid = recovered == expected_issuer.address();
    if !valid {
        debug!(
            "signature recovered {:?}, expected {}",
            recovered, expected_issuer
        );
    }
    Ok(valid)
}

/// Verifies credentials against one trusted schema.
///
/// The schema is handed in explicitly and shared with the issuer; a credential
/// whose embedded types differ from it is refused rather than re-derived.
#[derive(Debug, Clone)]
pub struct Verifier {
    schema: Arc<TypeSchema>,
}

impl Verifier {
    pub fn new(schema: Arc<TypeSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    pub fn verify(
        &self,
        domain: &DomainSeparator,
        document: &NormalizedDocument,
        signature: &SignatureParts,
        expected_issuer: &PkhIdentity,
    ) -> Result<bool> {
        verify_document(domain, &self.schema, document, signature, expected_issuer)
    }

    /// Verifies a signed envelope against the trusted schema, using the domain
    /// recorded in `proof.eip712` and the document's own `issuer`.
    pub fn verify_credential(&self, credential: &SignedCredential) -> Result<bool> {
        let context = &credential.proof.eip712;
        if context.primary_type != self.schema.primary_type()
            || !self.schema.matches_types(&context.types)
        {
            return Err(VerificationError::SchemaMismatch(self.schema.kind().to_owned()).into());
        }
        verify_envelope(&self.schema, credential)
    }
}

/// Verifies an envelope using only the types it carries.
///
/// For verifiers with no out-of-band schema; the embedded types are validated
/// before use.
pub fn verify_self_described(credential: &SignedCredential) -> Result<bool> {
    let context = &credential.proof.eip712;
    let mut types = context.types.clone();
    types.remove(EIP712_DOMAIN_TYPE);
    let schema = TypeSchema::new("self-described", 0, context.primary_type.clone(), types)
        .map_err(VerificationError::InvalidEmbeddedTypes)?;
    verify_envelope(&schema, credential)
}

fn verify_envelope(schema: &TypeSchema, credential: &SignedCredential) -> Result<bool> {
    let document = &credential.document;
    let issuer = document
        .issuer()
        .ok_or_else(|| VerificationError::MalformedIssuer("missing `issuer`".to_owned()))?;
    let issuer: PkhIdentity = issuer
        .parse()
        .map_err(|err: ConfigError| VerificationError::MalformedIssuer(err.to_string()))?;

    credential.proof.proof_value.validate()?;

    if document.issuance_date() != Some(credential.proof.created.as_str()) {
        warn!(
            "proof created {} does not match issuanceDate {:?}",
            credential.proof.created,
            document.issuance_date()
        );
        return Ok(false);
    }
    if credential.proof.verification_method != issuer.verification_method() {
        warn!(
            "verification method {} does not belong to issuer {}",
            credential.proof.verification_method, issuer
        );
        return Ok(false);
    }

    verify_document(
        &credential.proof.eip712.domain,
        schema,
        document,
        &credential.proof.proof_value,
        &issuer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::canonicalize::canonicalize;
    use crate::eip712::schema::{SchemaRegistry, DAO_VC_KIND};
    use crate::error::{Error, Stage};
    use crate::models::document::RawDocument;
    use crate::services::credential_issuer::{sign_document, CredentialIssuer};
    use chrono::{TimeZone, Utc};
    use ethers::signers::{LocalWallet, Signer};
    use ethers::types::H256;
    use serde_json::json;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const OTHER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const DOMAIN_NAME: &str = "dao-vc-verifier-test";

    fn wallet() -> LocalWallet {
        KEY.parse().unwrap()
    }

    fn schema() -> Arc<TypeSchema> {
        SchemaRegistry::builtin().get(DAO_VC_KIND).unwrap()
    }

    fn raw() -> RawDocument {
        serde_json::from_value(json!({
            "@context": ["https://example.org"],
            "type": ["DAO"],
            "credentialSubject": { "name": "Acme DAO", "category": "grants" }
        }))
        .unwrap()
    }

    async fn issue(domain: DomainSeparator) -> SignedCredential {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CredentialIssuer::new(wallet(), domain, schema())
            .issue_at(&raw(), at)
            .await
            .unwrap()
    }

    fn neutral() -> DomainSeparator {
        DomainSeparator::neutral(DOMAIN_NAME, 1).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_verifies() {
        let credential = issue(neutral()).await;
        let verifier = Verifier::new(schema());

        assert!(verifier.verify_credential(&credential).unwrap());
        assert!(verify_self_described(&credential).unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_with_empty_context_and_type() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut document = raw();
        document.context.clear();
        document.types.clear();
        let credential = CredentialIssuer::new(wallet(), neutral(), schema())
            .issue_at(&document, at)
            .await
            .unwrap();

        assert_eq!(credential.document.get("_context"), Some(&json!([])));
        assert!(Verifier::new(schema()).verify_credential(&credential).unwrap());
    }

    #[tokio::test]
    async fn test_verification_is_idempotent() {
        let credential = issue(neutral()).await;
        let verifier = Verifier::new(schema());

        let first = verifier.verify_credential(&credential).unwrap();
        let second = verifier.verify_credential(&credential).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_any_domain_change_breaks_verification() {
        let credential = issue(neutral()).await;
        let verifier = Verifier::new(schema());
        let issuer: PkhIdentity = credential.document.issuer().unwrap().parse().unwrap();
        let signature = credential.proof.proof_value;

        let changed = [
            DomainSeparator::neutral("another-verifier", 1).unwrap(),
            DomainSeparator::with_address(DOMAIN_NAME, "2", 1, Address::zero()).unwrap(),
            DomainSeparator::neutral(DOMAIN_NAME, 5).unwrap(),
            neutral().for_contract(Address::from_low_u64_be(0xc0ffee)),
        ];
        for domain in changed {
            let outcome = verifier.verify(&domain, &credential.document, &signature, &issuer);
            assert!(
                matches!(outcome, Ok(false)) || matches!(&outcome, Err(e) if e.is_invalid_signature()),
                "{domain:?} gave {outcome:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_permuted_schema_fails_verification() {
        let credential = issue(neutral()).await;
        let issuer: PkhIdentity = credential.document.issuer().unwrap().parse().unwrap();

        let mut types = schema().types().clone();
        types.get_mut("DaoVc").unwrap().swap(0, 1);
        let permuted = TypeSchema::new(DAO_VC_KIND, 1, "DaoVc", types).unwrap();

        let outcome = verify_document(
            &neutral(),
            &permuted,
            &credential.document,
            &credential.proof.proof_value,
            &issuer,
        );
        assert!(!matches!(outcome, Ok(true)));

        // a verifier trusting the original layout refuses the tampered envelope
        let mut tampered = credential.clone();
        tampered.proof.eip712.types = permuted.types().clone();
        assert!(matches!(
            Verifier::new(schema()).verify_credential(&tampered),
            Err(Error::Verification(VerificationError::SchemaMismatch(_)))
        ));
    }

    #[tokio::test]
    async fn test_neutral_contract_verifies_anywhere_pinned_does_not() {
        let verifier = Verifier::new(schema());
        let contract_a = Address::from_low_u64_be(0xa);
        let contract_b = Address::from_low_u64_be(0xb);

        let neutral_credential = issue(neutral()).await;
        let issuer: PkhIdentity = neutral_credential.document.issuer().unwrap().parse().unwrap();
        assert!(verifier
            .verify(
                &neutral(),
                &neutral_credential.document,
                &neutral_credential.proof.proof_value,
                &issuer
            )
            .unwrap());

        let pinned = issue(neutral().for_contract(contract_a)).await;
        assert!(verifier.verify_credential(&pinned).unwrap());
        let elsewhere = verifier.verify(
            &neutral().for_contract(contract_b),
            &pinned.document,
            &pinned.proof.proof_value,
            &issuer,
        );
        assert!(!matches!(elsewhere, Ok(true)));
    }

    #[tokio::test]
    async fn test_flipped_r_byte_never_verifies() {
        let credential = issue(neutral()).await;
        let mut tampered = credential.clone();
        let mut r = tampered.proof.proof_value.r.to_fixed_bytes();
        r[31] ^= 0x01;
        tampered.proof.proof_value.r = H256::from(r);

        let outcome = Verifier::new(schema()).verify_credential(&tampered);
        match outcome {
            Ok(valid) => assert!(!valid),
            Err(err) => assert!(err.is_invalid_signature(), "{err}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_v_is_an_error_not_false() {
        let mut credential = issue(neutral()).await;
        credential.proof.proof_value.v = 29;

        let err = Verifier::new(schema()).verify_credential(&credential).unwrap_err();
        assert!(err.is_invalid_signature());
        assert_eq!(err.stage(), Stage::Verification);
    }

    #[tokio::test]
    async fn test_invalid_v_with_foreign_verification_method_is_an_error() {
        let mut credential = issue(neutral()).await;
        credential.proof.proof_value.v = 29;
        credential.proof.verification_method = format!(
            "did:pkh:eip155:1:{:?}#blockchainAccountId",
            Address::from_low_u64_be(1)
        );

        let err = Verifier::new(schema()).verify_credential(&credential).unwrap_err();
        assert!(err.is_invalid_signature());
    }

    #[tokio::test]
    async fn test_foreign_verification_method_returns_false() {
        let mut credential = issue(neutral()).await;
        credential.proof.verification_method = format!(
            "did:pkh:eip155:1:{:?}#blockchainAccountId",
            Address::from_low_u64_be(1)
        );

        assert!(!Verifier::new(schema()).verify_credential(&credential).unwrap());
    }

    #[tokio::test]
    async fn test_created_differing_from_issuance_date_returns_false() {
        let mut credential = issue(neutral()).await;
        credential.proof.created = "2025-06-01T00:00:00.000Z".to_owned();

        assert!(!Verifier::new(schema()).verify_credential(&credential).unwrap());
        assert!(!verify_self_described(&credential).unwrap());
    }

    #[tokio::test]
    async fn test_invalid_embedded_types_are_reported_as_such() {
        let mut credential = issue(neutral()).await;
        credential.proof.eip712.types.remove("DAO");

        let err = verify_self_described(&credential).unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerificationError::InvalidEmbeddedTypes(_))
        ));
    }

    #[tokio::test]
    async fn test_other_signer_returns_false() {
        let domain = neutral();
        let credential = issue(domain.clone()).await;
        let other: LocalWallet = OTHER_KEY.parse().unwrap();
        let signature = sign_document(&other, &domain, &schema(), &credential.document)
            .await
            .unwrap();
        let issuer: PkhIdentity = credential.document.issuer().unwrap().parse().unwrap();

        assert_ne!(other.address(), issuer.address());
        assert!(!verify_document(&domain, &schema(), &credential.document, &signature.parts, &issuer).unwrap());
    }

    #[tokio::test]
    async fn test_tampered_subject_returns_false() {
        let mut credential = issue(neutral()).await;
        let mut fields = credential.document.clone().into_fields();
        fields["credentialSubject"]["category"] = json!("infrastructure");
        credential.document = NormalizedDocument::from_fields(fields);

        assert!(!Verifier::new(schema()).verify_credential(&credential).unwrap());
    }

    #[tokio::test]
    async fn test_unparseable_issuer_is_an_error() {
        let mut credential = issue(neutral()).await;
        let mut fields = credential.document.clone().into_fields();
        fields.insert("issuer".into(), json!("did:web:example.org"));
        credential.document = NormalizedDocument::from_fields(fields);

        let err = Verifier::new(schema()).verify_credential(&credential).unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerificationError::MalformedIssuer(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_key_does_not_verify_for_aed7_issuer() {
        let issuer: PkhIdentity = "did:pkh:eip155:1:0xAED7EA8035eEc47E657B34eF5D020c7005487443"
            .parse()
            .unwrap();
        let normalized = canonicalize(&raw(), &issuer, "2024-01-01T00:00:00.000Z").unwrap();
        let signature = sign_document(&wallet(), &neutral(), &schema(), &normalized)
            .await
            .unwrap();

        // signed by a key that is not 0xAED7...7443
        assert!(!verify_document(&neutral(), &schema(), &normalized, &signature.parts, &issuer).unwrap());
    }
}
