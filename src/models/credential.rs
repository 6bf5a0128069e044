// src/models/credential.rs
//! Signed Verifiable Credential envelope.
//!
//! The wire format is the normalized document with a `proof` block beside its
//! fields. `proof.eip712` carries the domain, primary type and types, so any
//! verifier can rebuild the exact hash input without out-of-band schema
//! knowledge.

use ethers::types::transaction::eip712::Types;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::eip712::canonicalize::decanonicalize;
use crate::eip712::domain::DomainSeparator;
use crate::error::CanonicalizationError;
use crate::models::document::NormalizedDocument;
use crate::models::signature::SignatureParts;

/// Signature suite identifier written to `proof.type`.
pub const PROOF_TYPE: &str = "EthereumEip712Signature2021";

/// `proof.proofPurpose` for issuer assertions.
pub const PROOF_PURPOSE: &str = "assertionMethod";

/// A normalized document and the proof over it. Never mutated once issued.
///
/// ```json
/// {
///   "_context": ["https://example.org"],
///   "_type": ["DAO"],
///   "credentialSubject": { "name": "Acme DAO", "category": "grants" },
///   "issuer": "did:pkh:eip155:1:0x...",
///   "issuanceDate": "2024-01-01T00:00:00.000Z",
///   "proof": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCredential {
    #[serde(flatten)]
    pub document: NormalizedDocument,

    pub proof: Proof,
}

impl SignedCredential {
    /// The credential in W3C shape: reserved field names restored, proof kept
    /// as issued. The signature still covers the normalized form.
    pub fn to_w3c(&self) -> Result<Value, CanonicalizationError> {
        let mut document = serde_json::to_value(decanonicalize(&self.document)?)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("proof".to_owned(), serde_json::to_value(&self.proof)?);
        }
        Ok(document)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Copy of the document's `issuanceDate`.
    pub created: String,

    pub eip712: Eip712Context,

    pub proof_purpose: String,

    pub proof_value: SignatureParts,

    #[serde(rename = "type")]
    pub proof_type: String,

    /// Issuer identity with the `#blockchainAccountId` fragment.
    pub verification_method: String,
}

/// Everything besides the message needed to recompute the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Context {
    pub domain: DomainSeparator,
    pub primary_type: String,
    pub types: Types,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> serde_json::Value {
        json!({
            "_context": ["https://example.org"],
            "_type": ["DAO"],
            "credentialSubject": { "name": "Acme DAO", "category": "grants" },
            "issuer": "did:pkh:eip155:1:0xAED7EA8035eEc47E657B34eF5D020c7005487443",
            "issuanceDate": "2024-01-01T00:00:00.000Z",
            "proof": {
                "created": "2024-01-01T00:00:00.000Z",
                "eip712": {
                    "domain": {
                        "name": "dao-vc-verifier-test",
                        "version": "1",
                        "chainId": 1,
                        "verifyingContract": "0x0000000000000000000000000000000000000000"
                    },
                    "primaryType": "DaoVc",
                    "types": {
                        "DAO": [
                            { "name": "name", "type": "string" },
                            { "name": "category", "type": "string" }
                        ]
                    }
                },
                "proofPurpose": "assertionMethod",
                "proofValue": {
                    "v": 27,
                    "r": "0x1111111111111111111111111111111111111111111111111111111111111111",
                    "s": "0x2222222222222222222222222222222222222222222222222222222222222222"
                },
                "type": "EthereumEip712Signature2021",
                "verificationMethod": "did:pkh:eip155:1:0xAED7EA8035eEc47E657B34eF5D020c7005487443#blockchainAccountId"
            }
        })
    }

    #[test]
    fn test_envelope_parses_and_keeps_document_fields_flat() {
        let credential: SignedCredential = serde_json::from_value(envelope()).unwrap();

        assert!(credential.document.get("proof").is_none());
        assert_eq!(credential.document.fields().len(), 5);
        assert_eq!(credential.proof.proof_type, PROOF_TYPE);
        assert_eq!(credential.proof.proof_purpose, PROOF_PURPOSE);
        assert_eq!(credential.proof.proof_value.v, 27);
        assert_eq!(credential.proof.eip712.domain.chain_id(), 1);
        assert_eq!(credential.proof.eip712.types["DAO"][1].name, "category");

        assert_eq!(serde_json::to_value(&credential).unwrap(), envelope());
    }

    #[test]
    fn test_w3c_shape_restores_reserved_fields() {
        let credential: SignedCredential = serde_json::from_value(envelope()).unwrap();
        let w3c = credential.to_w3c().unwrap();

        assert_eq!(w3c["@context"], json!(["https://example.org"]));
        assert_eq!(w3c["type"], json!(["DAO"]));
        assert!(w3c.get("_context").is_none());
        assert!(w3c.get("_type").is_none());
        assert_eq!(w3c["issuanceDate"], "2024-01-01T00:00:00.000Z");
        assert_eq!(w3c["proof"], envelope()["proof"]);
    }

    #[test]
    fn test_envelope_requires_eip712_context() {
        let mut value = envelope();
        value["proof"].as_object_mut().unwrap().remove("eip712");
        assert!(serde_json::from_value::<SignedCredential>(value).is_err());
    }
}
