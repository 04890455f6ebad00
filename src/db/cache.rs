//! Response cache: fingerprint → raw successful response body.
//!
//! The cache is append-only. Once a fingerprint is written it is never
//! overwritten or invalidated — the crawled endpoints are assumed
//! quasi-static, and replaying a crawl leans on cache hits to make
//! re-derivation of already-seen windows free.

use crate::error::DatabaseError;
use crate::{Error, Result};
use serde_json::Value;

use super::Database;

impl Database {
    /// Look up a cached response by fingerprint
    pub async fn cache_get(&self, fingerprint: &str) -> Result<Option<Value>> {
        let payload: Option<String> = sqlx::query_scalar(
            r#"
            SELECT payload FROM response_cache WHERE fingerprint = ?
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read response cache: {}",
                e
            )))
        })?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Store a successful response under its fingerprint
    ///
    /// A concurrent or repeated write for the same fingerprint is a no-op,
    /// never an overwrite.
    pub async fn cache_put(&self, fingerprint: &str, payload: &Value) -> Result<()> {
        let raw = serde_json::to_string(payload)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO response_cache (fingerprint, payload, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(fingerprint) DO NOTHING
            "#,
        )
        .bind(fingerprint)
        .bind(&raw)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write response cache: {}",
                e
            )))
        })?;

        Ok(())
    }
}
