//! Deterministic request fingerprints for the response cache
//!
//! A fingerprint is the SHA-256 of the request path concatenated with a
//! canonical serialization of the request body. Canonicalization sorts object
//! keys recursively, so two logically identical requests hash identically
//! regardless of how the caller ordered the body fields. Distinct logical
//! requests hashing to the same key would silently serve the wrong cached
//! response, which is why the canonical form includes the full path.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the cache fingerprint for a request
pub fn request_fingerprint(path: &str, body: Option<&Value>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    if let Some(body) = body {
        hasher.update(canonical_json(body).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Serialize a JSON value with all object keys sorted, recursively
fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Map keys are strings; serialization of a string cannot fail
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
