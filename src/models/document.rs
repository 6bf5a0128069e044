// src/models/document.rs
//! Credential document model.
//!
//! A document moves through three shapes before it is signed:
//! 1. [`RawDocument`] - the W3C-shaped payload (`@context`, `type`, `credentialSubject`)
//! 2. [`FullDocument`] - the raw payload stamped with `issuer` and `issuanceDate`
//! 3. [`NormalizedDocument`] - the full document with reserved field names aliased,
//!    ready to be hashed as an EIP-712 message
//!
//! Only the canonicalizer produces a [`NormalizedDocument`] from a full one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::identity::PkhIdentity;

/// The credential payload as written by its author.
///
/// `context` is semantically a set of namespace URIs, but its order is part of
/// the signed hash and is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// Domain-specific claims; their layout is described by the type schema.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Map<String, Value>,
}

impl RawDocument {
    pub fn new(
        context: Vec<String>,
        types: Vec<String>,
        credential_subject: Map<String, Value>,
    ) -> Self {
        Self {
            context,
            types,
            credential_subject,
        }
    }
}

/// A [`RawDocument`] stamped with its issuer and issuance time.
///
/// Created once at signing time and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullDocument {
    #[serde(flatten)]
    pub raw: RawDocument,

    pub issuer: String,

    /// ISO-8601 UTC timestamp, e.g. `2024-01-01T00:00:00.000Z`.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,
}

impl FullDocument {
    pub fn new(raw: RawDocument, issuer: &PkhIdentity, issuance_date: impl Into<String>) -> Self {
        Self {
            raw,
            issuer: issuer.to_string(),
            issuance_date: issuance_date.into(),
        }
    }
}

/// A full document whose reserved field names have been aliased.
///
/// Held as a JSON object so any registered type schema can describe it; the
/// field names are exactly those the schema declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedDocument {
    fields: Map<String, Value>,
}

impl NormalizedDocument {
    /// Wraps already-normalized fields. Use the canonicalizer to produce them.
    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get("issuer").and_then(Value::as_str)
    }

    pub fn issuance_date(&self) -> Option<&str> {
        self.get("issuanceDate").and_then(Value::as_str)
    }

    /// The fields as an EIP-712 message object.
    pub fn to_message(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
