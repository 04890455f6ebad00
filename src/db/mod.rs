//! Database layer for rangescan
//!
//! Handles SQLite persistence for the three durable stores the crawl engine
//! depends on:
//! - [`cache`] — response cache keyed by request fingerprint (append-only)
//! - [`checkpoints`] — checkpoint ledger marking completed units of work
//! - [`records`] — default record store with upsert-merge semantics
//!
//! Durability matters: the resumability guarantee assumes cache and ledger
//! survive a process restart, so both live in the same WAL-mode SQLite file.

use sqlx::FromRow;
use sqlx::sqlite::SqlitePool;

mod cache;
mod checkpoints;
mod migrations;
mod records;

/// Checkpoint record from database
#[derive(Debug, Clone, FromRow)]
pub struct CheckpointRow {
    /// Deterministic string encoding the logical unit of work
    pub unit_key: String,
    /// Unix timestamp when the unit completed
    pub completed_at: i64,
}

/// Stored record from the default record store
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    /// Caller-defined record identifier
    pub record_id: String,
    /// Merged JSON payload
    pub payload: String,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

/// Database handle for rangescan
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
