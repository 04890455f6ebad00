//! # rangescan
//!
//! Backend library for exhaustively crawling paginated search APIs that
//! silently truncate results past a hard cap.
//!
//! ## Design Philosophy
//!
//! rangescan is designed to be:
//! - **Adaptive** - Date ranges are subdivided on demand until every slice
//!   fits under the API's result cap
//! - **Resumable** - A checkpoint ledger and a response cache make a killed
//!   crawl restartable without re-fetching or duplicating anything
//! - **Polite** - Fixed request pacing, rotating credential sessions, and
//!   rate-limit-aware retries keep the crawl under the remote budget
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use rangescan::{Config, Crawler, DateInterval, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         credentials: vec![rangescan::Credential {
//!             identifier: "crawler@example.com".to_string(),
//!             secret: "secret".to_string(),
//!         }],
//!         ..Default::default()
//!     };
//!
//!     let crawler = Crawler::new(config).await?;
//!
//!     let query = SearchQuery::new("GET-ALL", "established", "regNo");
//!     let chunks = vec![
//!         DateInterval::new("1800-01-01".parse()?, "1989-12-31".parse()?)
//!             .ok_or("bad interval")?,
//!         DateInterval::new("1990-01-01".parse()?, "2026-12-31".parse()?)
//!             .ok_or("bad interval")?,
//!     ];
//!
//!     let stats = crawler.crawl(&query, &chunks, None).await?;
//!     println!("upserted {} records", stats.items_upserted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP transport for the remote search API
pub mod client;
/// Configuration types
pub mod config;
/// Adaptive range-partitioning crawl engine
pub mod crawler;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Request execution with caching, pacing, and retry
pub mod executor;
/// Deterministic request fingerprints for the response cache
pub mod fingerprint;
/// Retry logic with exponential backoff
pub mod retry;
/// Credential sessions and token rotation
pub mod session;
/// Record store seam and default implementations
pub mod store;
/// Core types shared across the engine
pub mod types;

// Re-export commonly used types
pub use client::{ApiClient, HttpMethod};
pub use config::{ApiConfig, AuthConfig, Config, CrawlConfig, Credential, RetryConfig};
pub use crawler::{Crawler, DateInterval, SearchWindow};
pub use db::Database;
pub use error::{DatabaseError, Error, Result};
pub use executor::{RequestExecutor, RequestSpec};
pub use session::SessionManager;
pub use store::{MemoryRecordStore, RecordStore, merge_records};
pub use types::{CrawlStats, ItemTransform, SearchPage, SearchQuery};
