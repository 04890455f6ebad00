//! Default record store backed by the crawl database.
//!
//! Implements the upsert-merge contract from [`crate::store`]: new fields
//! win, and a write whose merged result equals the stored record is skipped.

use crate::error::DatabaseError;
use crate::store::{RecordStore, merge_records};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{Database, RecordRow};

impl Database {
    /// Read one record by identifier
    pub async fn record_get(&self, record_id: &str) -> Result<Option<Value>> {
        let row: Option<RecordRow> = sqlx::query_as(
            r#"
            SELECT record_id, payload, updated_at FROM records WHERE record_id = ?
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read record: {}",
                e
            )))
        })?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.payload)?)),
            None => Ok(None),
        }
    }

    /// Count stored records
    pub async fn record_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count records: {}",
                    e
                )))
            })
    }

    /// Merge a payload into the record under `record_id`
    pub async fn record_upsert(&self, record_id: &str, payload: Value) -> Result<()> {
        let merged = match self.record_get(record_id).await? {
            Some(existing) => {
                let merged = merge_records(&existing, payload);
                if merged == existing {
                    return Ok(());
                }
                merged
            }
            None => payload,
        };

        let raw = serde_json::to_string(&merged)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO records (record_id, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(record_id) DO UPDATE SET payload = excluded.payload,
                                                 updated_at = excluded.updated_at
            "#,
        )
        .bind(record_id)
        .bind(&raw)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert record: {}",
                e
            )))
        })?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn upsert(&self, record_id: &str, payload: Value) -> Result<()> {
        self.record_upsert(record_id, payload).await
    }
}
