//! Request executor: one logical API call, end to end.
//!
//! For each request the executor acquires a session (when the endpoint needs
//! one), consults the response cache, applies the fixed pacing delay, issues
//! the call through the transport, and retries transient failures under the
//! policy in [`crate::retry`]. Successful cacheable responses are written to
//! the cache before they are returned, so a replayed crawl never pays for
//! the same request twice.

use crate::client::{ApiClient, HttpMethod};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::fingerprint::request_fingerprint;
use crate::retry::with_retry;
use crate::session::SessionManager;
use serde_json::Value;
use std::sync::Arc;

/// One logical API request
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// Endpoint path relative to the API base URL
    pub path: String,
    /// Optional JSON body (flattened to query parameters for GET)
    pub body: Option<Value>,
    /// HTTP method
    pub method: HttpMethod,
    /// Whether a successful response may be served from / written to the
    /// response cache. Caching is opt-in per request; auth endpoints must
    /// never set this.
    pub cacheable: bool,
    /// Whether the endpoint requires an authenticated session
    pub auth_required: bool,
}

impl RequestSpec {
    /// Cacheable authenticated POST — the shape of every search request
    pub fn search(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            body: Some(body),
            method: HttpMethod::Post,
            cacheable: true,
            auth_required: true,
        }
    }

    /// Cacheable authenticated GET
    pub fn get(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            path: path.into(),
            body,
            method: HttpMethod::Get,
            cacheable: true,
            auth_required: true,
        }
    }
}

/// Issues logical API calls with caching, pacing, sessions, and retry
pub struct RequestExecutor {
    client: Arc<ApiClient>,
    sessions: Arc<SessionManager>,
    db: Arc<Database>,
    config: Arc<Config>,
}

impl RequestExecutor {
    /// Wire an executor over its collaborators
    pub fn new(
        client: Arc<ApiClient>,
        sessions: Arc<SessionManager>,
        db: Arc<Database>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            client,
            sessions,
            db,
            config,
        }
    }

    /// Execute one logical request
    ///
    /// A cache hit returns without any network activity. Otherwise transient
    /// failures are retried up to the configured attempt ceiling; exhausting
    /// it returns the last error, and the caller decides whether that is
    /// fatal for the surrounding unit of work.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Value> {
        let fingerprint = request_fingerprint(&spec.path, spec.body.as_ref());

        if spec.cacheable
            && let Some(cached) = self.db.cache_get(&fingerprint).await?
        {
            tracing::debug!(path = %spec.path, "response cache hit");
            return Ok(cached);
        }

        let payload = with_retry(&self.config.retry, || self.attempt(spec)).await?;

        if spec.cacheable {
            self.db.cache_put(&fingerprint, &payload).await?;
        }

        Ok(payload)
    }

    /// One network attempt: session, pacing, transport call
    async fn attempt(&self, spec: &RequestSpec) -> Result<Value> {
        let token = if spec.auth_required {
            Some(self.sessions.acquire().await?.access_token)
        } else {
            None
        };

        // Fixed pacing delay before every network call keeps the pool under
        // the remote rate limit
        tokio::time::sleep(self.config.api.request_delay).await;

        self.client
            .request(spec.method, &spec.path, spec.body.as_ref(), token.as_deref())
            .await
    }
}
