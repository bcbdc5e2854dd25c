//! Content hashing for webhook delivery dedup.
//!
//! Two deliveries are the same event when the canonical form of their JSON
//! payloads hashes identically. Canonical form sorts object keys recursively
//! and uses compact separators, so semantically identical payloads with
//! reordered keys or different whitespace hash the same.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a JSON value with recursively sorted object keys and no
/// incidental whitespace.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    sort_value(value).to_string()
}

/// Hex-encoded SHA-256 of the canonical form of `payload`.
#[must_use]
pub fn payload_hash(payload: &Value) -> String {
    let digest = Sha256::digest(canonical_json(payload).as_bytes());
    to_hex(&digest)
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), sort_value(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
