//! Configuration types for rangescan

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Main configuration for [`Crawler`](crate::Crawler)
///
/// Fields are organized into logical sub-configs:
/// - [`api`](ApiConfig) — endpoint layout, paging limits, pacing
/// - [`credentials`](Credential) — account pool used for session rotation
/// - [`auth`](AuthConfig) — token lifetime
/// - [`retry`](RetryConfig) — per-request retry behavior
/// - [`crawl`](CrawlConfig) — crawl-unit retry and abandonment behavior
/// - [`persistence`](PersistenceConfig) — SQLite location
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API endpoint layout and request limits
    #[serde(default)]
    pub api: ApiConfig,

    /// Credential pool (at least one required for authenticated endpoints)
    #[serde(default)]
    pub credentials: Vec<Credential>,

    /// Token lifetime settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Retry behavior for individual requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Retry behavior for whole crawl units
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Remote search API configuration
///
/// Paths are joined onto `base_url`; the defaults mirror a conventional
/// `app/search/*` + `account/*` endpoint layout and can be overridden per API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API, with trailing slash (e.g. "https://backend.example.com/")
    pub base_url: String,

    /// Path of the paginated advanced-search endpoint (POST)
    #[serde(default = "default_search_path")]
    pub search_path: String,

    /// Path of the quick-search endpoint (GET)
    #[serde(default = "default_quick_search_path")]
    pub quick_search_path: String,

    /// Path of the login endpoint (POST)
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path of the token refresh endpoint (POST)
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Path of the non-paginated filter-limits endpoint (GET)
    #[serde(default = "default_filter_limits_path")]
    pub filter_limits_path: String,

    /// Items requested per page (default: 50)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum result count the API returns correctly for one query (default: 5000)
    ///
    /// Beyond this cap results are truncated or undercounted; intervals whose
    /// reported total exceeds it are subdivided instead of paged.
    #[serde(default = "default_result_cap")]
    pub result_cap: u64,

    /// Fixed pacing delay applied before every network attempt (default: 130 ms)
    #[serde(default = "default_request_delay", with = "duration_millis_serde")]
    pub request_delay: Duration,

    /// HTTP request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_millis_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            search_path: default_search_path(),
            quick_search_path: default_quick_search_path(),
            login_path: default_login_path(),
            refresh_path: default_refresh_path(),
            filter_limits_path: default_filter_limits_path(),
            page_size: default_page_size(),
            result_cap: default_result_cap(),
            request_delay: default_request_delay(),
            timeout: default_timeout(),
        }
    }
}

/// A single account used to authenticate against the API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    /// Account identifier (email or username)
    pub identifier: String,

    /// Account secret (password)
    pub secret: String,
}

/// Authentication token settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// How long an access token is considered fresh before a refresh exchange
    /// is performed (default: 200 seconds)
    #[serde(default = "default_token_ttl", with = "duration_millis_serde")]
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: default_token_ttl(),
        }
    }
}

/// Retry configuration for transient request failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts per request (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Backoff base used when the API reports too many requests (default: 30 seconds)
    #[serde(default = "default_rate_limit_delay", with = "duration_millis_serde")]
    pub rate_limit_delay: Duration,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            rate_limit_delay: default_rate_limit_delay(),
            jitter: true,
        }
    }
}

/// Crawl-unit retry configuration
///
/// When a request exhausts its own retry budget the failure bubbles up to the
/// crawl-unit loop, which retries the whole unit a bounded number of times
/// before abandoning it and moving on to the next unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Attempts per crawl unit before it is abandoned (default: 5)
    #[serde(default = "default_unit_attempts")]
    pub unit_attempts: u32,

    /// Sleep between crawl-unit attempts (default: 10 seconds)
    #[serde(default = "default_unit_retry_delay", with = "duration_millis_serde")]
    pub unit_retry_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            unit_attempts: default_unit_attempts(),
            unit_retry_delay: default_unit_retry_delay(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database holding the response cache, checkpoint
    /// ledger, and default record store (default: "rangescan.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

// Default value functions
fn default_search_path() -> String {
    "app/search/advanced/".to_string()
}

fn default_quick_search_path() -> String {
    "app/search/quick/".to_string()
}

fn default_login_path() -> String {
    "account/log-in/".to_string()
}

fn default_refresh_path() -> String {
    "account/refresh/".to_string()
}

fn default_filter_limits_path() -> String {
    "app/search/filter-limits/".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_result_cap() -> u64 {
    5000
}

fn default_request_delay() -> Duration {
    Duration::from_millis(130)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(200)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_rate_limit_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_unit_attempts() -> u32 {
    5
}

fn default_unit_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("rangescan.db")
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (milliseconds — sub-second pacing delays matter here)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
