//! Checkpoint ledger: durable "this unit of work is done" markers.
//!
//! Used as a pre-flight skip check before starting a unit and written only
//! after the unit's side effects have been fully applied. That ordering gives
//! at-least-once delivery of items and at-most-once re-execution of a
//! completed unit after a restart. Marking a unit done before its items are
//! persisted would silently lose data on a crash, so callers must never
//! invert it.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{CheckpointRow, Database};

impl Database {
    /// Check whether a unit of work has already completed
    pub async fn is_done(&self, unit_key: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM checkpoints WHERE unit_key = ?
            "#,
        )
        .bind(unit_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check checkpoint: {}",
                e
            )))
        })?;

        Ok(count > 0)
    }

    /// Mark a unit of work as completed
    ///
    /// Idempotent: a duplicate mark for the same key keeps the original
    /// completion timestamp.
    pub async fn mark_done(&self, unit_key: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO checkpoints (unit_key, completed_at)
            VALUES (?, ?)
            ON CONFLICT(unit_key) DO NOTHING
            "#,
        )
        .bind(unit_key)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write checkpoint: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// List every completed unit, oldest first
    ///
    /// Inspection helper for operators and tests; the crawl path only ever
    /// looks up single keys.
    pub async fn completed_units(&self) -> Result<Vec<CheckpointRow>> {
        sqlx::query_as(
            r#"
            SELECT unit_key, completed_at FROM checkpoints ORDER BY completed_at, unit_key
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list checkpoints: {}",
                e
            )))
        })
    }
}
