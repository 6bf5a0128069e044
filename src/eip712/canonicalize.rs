// src/eip712/canonicalize.rs
//! Canonicalization of credential documents into EIP-712 messages.
//!
//! `@context` is not a legal EIP-712 field name and `type` collides with the
//! field descriptor key, so both are renamed before hashing. The renames live in
//! one table used in both directions; signer and verifier must agree on it
//! byte for byte or their digests diverge.

use serde_json::{Map, Value};

use crate::error::CanonicalizationError;
use crate::models::document::{FullDocument, NormalizedDocument, RawDocument};
use crate::models::identity::PkhIdentity;

/// `(reserved field, alias)` pairs applied in order.
pub const RESERVED_FIELD_ALIASES: [(&str, &str); 2] = [("@context", "_context"), ("type", "_type")];

/// Name a field carries in a normalized document.
pub fn alias_of(field: &str) -> &str {
    RESERVED_FIELD_ALIASES
        .iter()
        .find(|(reserved, _)| *reserved == field)
        .map_or(field, |(_, alias)| alias)
}

/// Stamps `raw` with its issuer and issuance date, then aliases reserved fields.
///
/// Pure: the same inputs always yield the same field layout and values.
pub fn canonicalize(
    raw: &RawDocument,
    issuer: &PkhIdentity,
    issuance_date: &str,
) -> Result<NormalizedDocument, CanonicalizationError> {
    normalize(&FullDocument::new(raw.clone(), issuer, issuance_date))
}

pub fn normalize(full: &FullDocument) -> Result<NormalizedDocument, CanonicalizationError> {
    normalize_value(serde_json::to_value(full)?)
}

/// Normalizes an arbitrary JSON document already carrying `issuer` and
/// `issuanceDate`.
pub fn normalize_value(document: Value) -> Result<NormalizedDocument, CanonicalizationError> {
    match document {
        Value::Object(fields) => Ok(NormalizedDocument::from_fields(apply_aliases(fields)?)),
        _ => Err(CanonicalizationError::NotAnObject),
    }
}

/// Renames every reserved field to its alias.
///
/// A reserved field that is absent stays absent. An alias already present in
/// the document is a collision, never an overwrite.
pub fn apply_aliases(
    mut fields: Map<String, Value>,
) -> Result<Map<String, Value>, CanonicalizationError> {
    for (reserved, alias) in RESERVED_FIELD_ALIASES {
        if fields.contains_key(alias) {
            return Err(CanonicalizationError::AliasCollision {
                field: reserved,
                alias,
            });
        }
        if let Some(value) = fields.remove(reserved) {
            fields.insert(alias.to_owned(), value);
        }
    }
    Ok(fields)
}

/// Inverse of [`apply_aliases`], for presenting a normalized document in its
/// W3C shape.
pub fn restore_reserved(
    mut fields: Map<String, Value>,
) -> Result<Map<String, Value>, CanonicalizationError> {
    for (reserved, alias) in RESERVED_FIELD_ALIASES {
        if fields.contains_key(reserved) {
            return Err(CanonicalizationError::AliasCollision {
                field: reserved,
                alias,
            });
        }
        if let Some(value) = fields.remove(alias) {
            fields.insert(reserved.to_owned(), value);
        }
    }
    Ok(fields)
}

/// Recovers the W3C-shaped full document from a normalized one.
pub fn decanonicalize(document: &NormalizedDocument) -> Result<FullDocument, CanonicalizationError> {
    let fields = restore_reserved(document.fields().clone())?;
    Ok(serde_json::from_value(Value::Object(fields))?)
}
