// src/eip712/schema.rs
//! Versioned EIP-712 type schemas and the registry that serves them.
//!
//! A schema's field order defines the hash layout. Signer and verifier must
//! hash with the very same value, so schemas are handed out as shared
//! `Arc<TypeSchema>` and never edited; a layout change is a new kind.

use ethers::types::transaction::eip712::{Eip712DomainType, Types};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::eip712::canonicalize::RESERVED_FIELD_ALIASES;
use crate::error::ConfigError;

/// Kind of the built-in DAO membership credential.
pub const DAO_VC_KIND: &str = "dao-vc";

/// Primary type of the built-in DAO membership credential.
pub const DAO_VC_PRIMARY_TYPE: &str = "DaoVc";

/// Name of the mandatory domain type.
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// Domain type layout every schema is signed under.
pub fn domain_type() -> Vec<Eip712DomainType> {
    fields(&[
        ("name", "string"),
        ("version", "string"),
        ("chainId", "uint256"),
        ("verifyingContract", "address"),
    ])
}

fn fields(pairs: &[(&str, &str)]) -> Vec<Eip712DomainType> {
    pairs
        .iter()
        .map(|(name, ty)| Eip712DomainType {
            name: (*name).to_owned(),
            r#type: (*ty).to_owned(),
        })
        .collect()
}

/// An immutable EIP-712 type graph for one credential kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    kind: String,
    version: u32,
    primary_type: String,
    types: Types,
}

impl TypeSchema {
    /// Builds and validates a schema.
    ///
    /// # Errors
    /// `InvalidSchema` when the primary type is missing, a field references an
    /// undeclared type, a type repeats a field name, or a field keeps a name
    /// the canonicalizer reserves.
    pub fn new(
        kind: impl Into<String>,
        version: u32,
        primary_type: impl Into<String>,
        types: Types,
    ) -> Result<Self, ConfigError> {
        let schema = Self {
            kind: kind.into(),
            version,
            primary_type: primary_type.into(),
            types,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    /// Credential types, without the domain type.
    pub fn types(&self) -> &Types {
        &self.types
    }

    pub fn fields_of(&self, type_name: &str) -> Option<&[Eip712DomainType]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    pub fn is_struct_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Credential types plus `EIP712Domain`, as a wallet expects them.
    pub fn types_with_domain(&self) -> Types {
        let mut types = self.types.clone();
        types.insert(EIP712_DOMAIN_TYPE.to_owned(), domain_type());
        types
    }

    /// True when `types` describes exactly this schema's layout.
    pub fn matches_types(&self, types: &Types) -> bool {
        let mut other = types.clone();
        other.remove(EIP712_DOMAIN_TYPE);
        other == self.types
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSchema {
            kind: self.kind.clone(),
            reason,
        };

        if !self.types.contains_key(&self.primary_type) {
            return Err(invalid(format!(
                "primary type `{}` is not declared",
                self.primary_type
            )));
        }
        if self.types.contains_key(EIP712_DOMAIN_TYPE) {
            return Err(invalid(format!("`{EIP712_DOMAIN_TYPE}` is implicit")));
        }

        for (type_name, type_fields) in &self.types {
            let mut seen = HashSet::new();
            for field in type_fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(invalid(format!(
                        "`{type_name}` declares `{}` twice",
                        field.name
                    )));
                }
                if let Some((reserved, alias)) = RESERVED_FIELD_ALIASES
                    .iter()
                    .find(|(reserved, _)| *reserved == field.name)
                {
                    return Err(invalid(format!(
                        "`{type_name}` uses reserved name `{reserved}`, declare `{alias}`"
                    )));
                }
                let base = base_type(&field.r#type);
                if !is_primitive(base) && !self.types.contains_key(base) {
                    return Err(invalid(format!(
                        "`{type_name}.{}` references undeclared type `{base}`",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `string[]` -> `string`, `DAO[2][]` -> `DAO`
pub(crate) fn base_type(ty: &str) -> &str {
    ty.split('[').next().unwrap_or(ty)
}

fn is_primitive(ty: &str) -> bool {
    let sized = |prefix: &str, max: u32, step: u32| {
        ty.strip_prefix(prefix)
            .and_then(|bits| bits.parse::<u32>().ok())
            .map_or(false, |bits| bits > 0 && bits <= max && bits % step == 0)
    };
    matches!(ty, "string" | "bytes" | "bool" | "address" | "uint" | "int")
        || sized("uint", 256, 8)
        || sized("int", 256, 8)
        || sized("bytes", 32, 1)
}

/// Schemas by kind, frozen once built.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<TypeSchema>>,
}

static BUILTIN: Lazy<SchemaRegistry> = Lazy::new(|| {
    let mut registry = SchemaRegistry::default();
    let dao = Arc::new(dao_vc_v1());
    registry.schemas.insert(dao.kind.clone(), dao);
    registry
});

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shipped with this crate.
    pub fn builtin() -> &'static SchemaRegistry {
        &BUILTIN
    }

    /// Adds a schema under its kind.
    ///
    /// # Errors
    /// `DuplicateSchema` if the kind is taken; publish a new kind instead of
    /// replacing a layout credentials may already be signed under.
    pub fn register(&mut self, schema: TypeSchema) -> Result<Arc<TypeSchema>, ConfigError> {
        if self.schemas.contains_key(&schema.kind) {
            return Err(ConfigError::DuplicateSchema(schema.kind));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.kind.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, kind: &str) -> Result<Arc<TypeSchema>, ConfigError> {
        self.schemas
            .get(kind)
            .cloned()
            .ok_or_else(|| ConfigError::SchemaNotFound(kind.to_owned()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

/// DAO membership credential, layout version 1.
///
/// ```text
/// DaoVc(string[] _context,string[] _type,string issuer,string issuanceDate,DAO credentialSubject)
/// DAO(string name,string category)
/// ```
fn dao_vc_v1() -> TypeSchema {
    let mut types = Types::new();
    types.insert(
        DAO_VC_PRIMARY_TYPE.to_owned(),
        fields(&[
            ("_context", "string[]"),
            ("_type", "string[]"),
            ("issuer", "string"),
            ("issuanceDate", "string"),
            ("credentialSubject", "DAO"),
        ]),
    );
    types.insert(
        "DAO".to_owned(),
        fields(&[("name", "string"), ("category", "string")]),
    );

    TypeSchema {
        kind: DAO_VC_KIND.to_owned(),
        version: 1,
        primary_type: DAO_VC_PRIMARY_TYPE.to_owned(),
        types,
    }
}
