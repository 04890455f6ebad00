//! HTTP transport wrapper for the remote search API
//!
//! [`ApiClient`] owns the single `reqwest::Client` and maps raw HTTP outcomes
//! into the crawl error taxonomy:
//! - connection failures, timeouts, and non-JSON bodies → [`Error::Transport`]
//! - HTTP 429 → [`Error::RateLimited`]
//! - HTTP 200 with an embedded `error` field → [`Error::Api`]
//!
//! The client is deliberately thin: sessions, caching, pacing, and retries
//! live in [`crate::session`] and [`crate::executor`].

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use serde_json::Value;
use url::Url;

/// HTTP method for an API request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET with the body flattened into query parameters
    Get,
    /// POST with a JSON body
    Post,
}

/// Thin JSON-over-HTTP client for one API
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the configured API
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", config.base_url, e),
            key: Some("api.base_url".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Transport)?;

        Ok(Self { base_url, client })
    }

    /// Issue one JSON request and classify the outcome
    ///
    /// `token`, when present, is sent as a bearer Authorization header.
    /// For GET requests the top-level fields of `body` become query
    /// parameters, scalars rendered as strings.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = self.base_url.join(path).map_err(|e| Error::Config {
            message: format!("invalid request path '{}': {}", path, e),
            key: None,
        })?;

        let mut request = match method {
            HttpMethod::Get => {
                let mut request = self.client.get(url);
                if let Some(Value::Object(fields)) = body {
                    let params: Vec<(String, String)> = fields
                        .iter()
                        .map(|(k, v)| (k.clone(), query_value(v)))
                        .collect();
                    request = request.query(&params);
                }
                request
            }
            HttpMethod::Post => {
                let mut request = self.client.post(url);
                if let Some(body) = body {
                    request = request.json(body);
                }
                request
            }
        };

        request = request.header("accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }

        // A non-JSON body surfaces as a decode error, i.e. Transport
        let payload: Value = response.json().await?;

        // Some endpoints report failures inside a 200 body
        if let Some(error) = payload.get("error")
            && !error.is_null()
        {
            return Err(Error::Api(error.to_string()));
        }

        Ok(payload)
    }
}

/// Render a JSON value as a query parameter string
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
