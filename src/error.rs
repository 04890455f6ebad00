//! Error types for rangescan
//!
//! This module provides the error taxonomy for the crawl engine:
//! - Transport-level failures (connection errors, malformed bodies)
//! - Rate limiting (HTTP 429)
//! - Authentication failures (login/refresh exchanges)
//! - Logical API errors (HTTP 200 with an embedded error field)
//! - Database and configuration errors
//!
//! The first four are transient and drive the retry layer (see [`crate::retry`]);
//! the rest are permanent and surface immediately.

use thiserror::Error;

/// Result type alias for rangescan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rangescan
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Transport-level network error (connection failure, timeout, non-JSON body)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API reported too many requests (HTTP 429)
    #[error("rate limited by remote API (HTTP 429)")]
    RateLimited,

    /// Authentication or token refresh failed for a credential
    #[error("authentication failed for {identifier}: {reason}")]
    Auth {
        /// Credential identifier the failure applies to
        identifier: String,
        /// Why the login or refresh exchange failed
        reason: String,
    },

    /// The API responded successfully at the HTTP level but carried an error field
    #[error("API error: {0}")]
    Api(String),

    /// No credentials are configured, so no session can be acquired
    #[error("no credentials configured")]
    NoCredentials,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}
