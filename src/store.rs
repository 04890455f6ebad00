//! Record store seam: where crawled items end up.
//!
//! The engine only needs one capability from its downstream store: an
//! idempotent upsert that merges new fields into any existing record and
//! skips the write entirely when nothing changed. That equality
//! short-circuit is what makes crash-replay safe — re-delivering an item a
//! second time is a no-op rather than a duplicate.
//!
//! [`Database`](crate::db::Database) provides the default SQLite-backed
//! implementation; [`MemoryRecordStore`] is a lightweight alternative for
//! tests and embedding.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Destination for crawled records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Merge `payload` into any existing record under `record_id`
    ///
    /// New fields win over existing ones. Implementations must short-circuit
    /// when the merged result equals the existing record.
    async fn upsert(&self, record_id: &str, payload: Value) -> Result<()>;
}

/// Shallow-merge a new payload over an existing record
///
/// Top-level fields of `incoming` replace fields of `existing`; fields absent
/// from `incoming` are preserved. Non-object payloads replace wholesale.
pub fn merge_records(existing: &Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (_, incoming) => incoming,
    }
}

/// In-memory record store for tests and embedding
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one record back
    pub async fn get(&self, record_id: &str) -> Option<Value> {
        self.records.lock().await.get(record_id).cloned()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert(&self, record_id: &str, payload: Value) -> Result<()> {
        let mut records = self.records.lock().await;
        let merged = match records.get(record_id) {
            Some(existing) => {
                let merged = merge_records(existing, payload);
                if &merged == existing {
                    return Ok(());
                }
                merged
            }
            None => payload,
        };
        records.insert(record_id.to_string(), merged);
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_new_fields_win() {
        let existing = json!({"regNo": "BG1", "name": "Old Name", "city": "Sofia"});
        let incoming = json!({"regNo": "BG1", "name": "New Name"});
        let merged = merge_records(&existing, incoming);
        assert_eq!(
            merged,
            json!({"regNo": "BG1", "name": "New Name", "city": "Sofia"})
        );
    }

    #[test]
    fn merge_non_object_replaces() {
        let existing = json!({"a": 1});
        let merged = merge_records(&existing, json!("plain"));
        assert_eq!(merged, json!("plain"));
    }

    #[tokio::test]
    async fn memory_store_inserts_and_merges() {
        let store = MemoryRecordStore::new();
        store
            .upsert("BG1", json!({"name": "Acme", "city": "Sofia"}))
            .await
            .unwrap();
        store.upsert("BG1", json!({"name": "Acme Ltd"})).await.unwrap();

        let record = store.get("BG1").await.unwrap();
        assert_eq!(record, json!({"name": "Acme Ltd", "city": "Sofia"}));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn memory_store_equal_payload_is_noop() {
        let store = MemoryRecordStore::new();
        store.upsert("BG1", json!({"name": "Acme"})).await.unwrap();
        // Same payload again must not change anything
        store.upsert("BG1", json!({"name": "Acme"})).await.unwrap();
        assert_eq!(store.get("BG1").await.unwrap(), json!({"name": "Acme"}));
    }
}
