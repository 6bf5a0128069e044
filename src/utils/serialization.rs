// src/utils/serialization.rs
//! Serialization utilities for credential documents and envelopes.
//!
//! Provides:
//! - Signed credential envelopes written for humans (pretty JSON)
//! - Credential files read from disk

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Serializes a value to indented JSON, the layout used when printing
/// credentials for presentation.
pub fn serialize_pretty<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Reads and deserializes a JSON file.
///
/// # Errors
/// Returns an `io::Error` when the file cannot be read or does not hold
/// a value of the requested shape.
pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> std::io::Result<T> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(std::io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::RawDocument;
    use std::io::Write;

    #[test]
    fn test_read_json_file_loads_raw_document() {
        let mut path = std::env::temp_dir();
        path.push(format!("dao-vc-serialization-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"@context":["https://example.org"],"type":["DAO"],"credentialSubject":{{"name":"Acme DAO","category":"grants"}}}}"#
        )
        .unwrap();

        let document: RawDocument = read_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(document.context, vec!["https://example.org"]);
        assert_eq!(document.types, vec!["DAO"]);
    }

    #[test]
    fn test_read_json_file_reports_bad_shape() {
        let mut path = std::env::temp_dir();
        path.push(format!("dao-vc-serialization-bad-{}.json", std::process::id()));
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let result: std::io::Result<RawDocument> = read_json_file(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }
}
