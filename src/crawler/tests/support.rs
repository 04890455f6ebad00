//! Shared harness for crawl-engine tests: a scriptable search endpoint and
//! a crawler wired to a mock server, a temp database, and a memory store.

use crate::config::{Config, Credential, RetryConfig};
use crate::crawler::Crawler;
use crate::crawler::window::DateInterval;
use crate::store::MemoryRecordStore;
use crate::types::SearchQuery;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub(super) fn interval(start: &str, end: &str) -> DateInterval {
    DateInterval::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
}

pub(super) fn query() -> SearchQuery {
    SearchQuery::new("GET-ALL", "established", "regNo")
}

/// Scriptable advanced-search endpoint
///
/// Totals are keyed by the interval bounds taken from the request body, and
/// items are generated deterministically from the interval start and the
/// offset, so every page of every interval yields stable identifiers.
/// Individual pages can be scripted to fail a number of times with an
/// embedded error payload.
#[derive(Clone, Default)]
pub(super) struct ScriptedSearch {
    totals: Arc<Mutex<HashMap<(String, String), u64>>>,
    failures: Arc<Mutex<HashMap<(String, String, u64), u32>>>,
    calls: Arc<AtomicU64>,
}

impl ScriptedSearch {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn total(self, min: &str, max: &str, total: u64) -> Self {
        self.totals
            .lock()
            .unwrap()
            .insert((min.to_string(), max.to_string()), total);
        self
    }

    pub(super) fn fail(self, min: &str, max: &str, skip: u64, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert((min.to_string(), max.to_string(), skip), times);
        self
    }

    pub(super) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Respond for ScriptedSearch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let min = body["established"]["min"].as_str().unwrap().to_string();
        let max = body["established"]["max"].as_str().unwrap().to_string();
        let skip = body["skip"].as_u64().unwrap();
        let limit = body["limit"].as_u64().unwrap();

        if let Some(remaining) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&(min.clone(), max.clone(), skip))
            && *remaining > 0
        {
            *remaining -= 1;
            return ResponseTemplate::new(200).set_body_json(json!({"error": "transient"}));
        }

        let total = self
            .totals
            .lock()
            .unwrap()
            .get(&(min.clone(), max.clone()))
            .copied()
            .unwrap_or(0);

        let items: Vec<Value> = (skip..total.min(skip + limit))
            .map(|i| json!({"regNo": format!("{min}:{i}"), "established": min}))
            .collect();

        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"total": total, "items": items}}))
    }
}

/// Small pages and a low result cap keep the scripted scenarios cheap:
/// page size 10, result cap 100, fail-fast request retries.
pub(super) fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/", server.uri());
    config.api.page_size = 10;
    config.api.result_cap = 100;
    config.api.request_delay = Duration::from_millis(1);
    config.credentials = vec![Credential {
        identifier: "crawler@example.com".to_string(),
        secret: "hunter2".to_string(),
    }];
    config.retry = RetryConfig {
        max_attempts: 0,
        initial_delay: Duration::from_millis(1),
        jitter: false,
        ..RetryConfig::default()
    };
    config.crawl.unit_attempts = 1;
    config.crawl.unit_retry_delay = Duration::from_millis(5);
    config
}

pub(super) async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/account/log-in/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "refreshToken": "ref-1",
        })))
        .mount(server)
        .await;
}

pub(super) async fn mount_search(server: &MockServer, responder: ScriptedSearch) {
    Mock::given(method("POST"))
        .and(path("/app/search/advanced/"))
        .respond_with(responder)
        .mount(server)
        .await;
}

pub(super) async fn crawler_on(
    mut config: Config,
    store: Arc<MemoryRecordStore>,
    db_path: &Path,
) -> Crawler {
    config.persistence.database_path = db_path.to_path_buf();
    Crawler::with_store(config, store).await.unwrap()
}

pub(super) async fn crawler_for(
    config: Config,
    store: Arc<MemoryRecordStore>,
) -> (Crawler, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let crawler = crawler_on(config, store, temp_file.path()).await;
    (crawler, temp_file)
}
