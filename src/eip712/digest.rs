// src/eip712/digest.rs
//! EIP-712 digest of a normalized document.
//!
//! `keccak256(0x19 0x01 || hashStruct(domain) || hashStruct(message))`, computed
//! recursively over the schema's declared field order. Signer and verifier both
//! go through [`typed_data`] so there is one encoding path.

use ethers::types::transaction::eip712::{hash_struct, Eip712, Eip712Error, TypedData};
use ethers::types::H256;
use serde_json::Value;
use thiserror::Error;

use crate::eip712::domain::DomainSeparator;
use crate::eip712::schema::{base_type, TypeSchema};
use crate::models::document::NormalizedDocument;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("message is missing field `{field}` declared by type `{type_name}`")]
    MissingField { type_name: String, field: String },

    #[error("field `{type_name}.{field}` must be an object")]
    NotAnObject { type_name: String, field: String },

    #[error("typed-data encoding failed: {0}")]
    Encoding(#[from] Eip712Error),
}

/// Builds the typed-data payload handed to a signing identity.
///
/// # Errors
/// `MissingField` when the document lacks a field the schema declares. The
/// generic encoder would hash a missing struct as zero, so absence is caught
/// here instead.
pub fn typed_data(
    domain: &DomainSeparator,
    schema: &TypeSchema,
    document: &NormalizedDocument,
) -> Result<TypedData, DigestError> {
    let message = document.to_message();
    check_fields(
        schema,
        schema.primary_type(),
        &Value::Object(document.fields().clone()),
    )?;

    Ok(TypedData {
        domain: domain.to_eip712(),
        types: schema.types_with_domain(),
        primary_type: schema.primary_type().to_owned(),
        message,
    })
}

pub fn digest(
    domain: &DomainSeparator,
    schema: &TypeSchema,
    document: &NormalizedDocument,
) -> Result<H256, DigestError> {
    let payload = typed_data(domain, schema, document)?;
    Ok(H256::from(payload.encode_eip712()?))
}

/// `hashStruct(message)` alone, without the domain.
pub fn struct_hash(schema: &TypeSchema, document: &NormalizedDocument) -> Result<H256, DigestError> {
    let message = Value::Object(document.fields().clone());
    check_fields(schema, schema.primary_type(), &message)?;
    Ok(H256::from(hash_struct(
        schema.primary_type(),
        &message,
        schema.types(),
    )?))
}

fn check_fields(schema: &TypeSchema, type_name: &str, value: &Value) -> Result<(), DigestError> {
    let Some(fields) = schema.fields_of(type_name) else {
        return Ok(());
    };

    for field in fields {
        let Some(field_value) = value.get(&field.name) else {
            return Err(DigestError::MissingField {
                type_name: type_name.to_owned(),
                field: field.name.clone(),
            });
        };

        let base = base_type(&field.r#type);
        if !schema.is_struct_type(base) {
            continue;
        }
        let not_object = || DigestError::NotAnObject {
            type_name: type_name.to_owned(),
            field: field.name.clone(),
        };
        if field.r#type == base {
            if !field_value.is_object() {
                return Err(not_object());
            }
            check_fields(schema, base, field_value)?;
        } else if let Some(items) = field_value.as_array() {
            for item in items {
                if !item.is_object() {
                    return Err(not_object());
                }
                check_fields(schema, base, item)?;
            }
        }
    }
    Ok(())
}
