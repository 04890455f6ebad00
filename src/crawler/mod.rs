//! The crawl engine: adaptive range partitioning with resumable checkpoints.
//!
//! A [`Crawler`] walks a search API whose queries silently truncate past a
//! result cap. Each configured chunk of the date range is drained by the
//! partitioner in [`partition`]; a chunk that completes is recorded in the
//! checkpoint ledger so a rerun skips it entirely, and a chunk that fails is
//! retried a bounded number of times before being abandoned for the run.

use crate::client::ApiClient;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::executor::{RequestExecutor, RequestSpec};
use crate::session::SessionManager;
use crate::store::RecordStore;
use crate::types::{CrawlStats, ItemTransform, SearchQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

mod partition;
pub mod window;

pub use window::{DateInterval, SearchWindow};

use partition::{Partitioner, extract_record_id};
use window::chunk_key;

/// Crawl engine handle
///
/// Owns the HTTP client, the credential pool, the SQLite database backing the
/// response cache and checkpoint ledger, and the record store that receives
/// extracted items.
pub struct Crawler {
    config: Arc<Config>,
    db: Arc<Database>,
    store: Arc<dyn RecordStore>,
    executor: Arc<RequestExecutor>,
}

impl Crawler {
    /// Open the crawler with records persisted in the crawl database itself
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let store: Arc<dyn RecordStore> = db.clone();
        Self::build(config, db, store)
    }

    /// Open the crawler with a caller-provided record store
    ///
    /// The crawl database still holds the response cache and checkpoint
    /// ledger; only extracted items go to `store`.
    pub async fn with_store(config: Config, store: Arc<dyn RecordStore>) -> Result<Self> {
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        Self::build(config, db, store)
    }

    fn build(config: Config, db: Arc<Database>, store: Arc<dyn RecordStore>) -> Result<Self> {
        let config = Arc::new(config);
        let client = Arc::new(ApiClient::new(&config.api)?);
        let sessions = Arc::new(SessionManager::new(
            client.clone(),
            &config.api,
            &config.auth,
            &config.credentials,
        ));
        let executor = Arc::new(RequestExecutor::new(
            client,
            sessions,
            db.clone(),
            config.clone(),
        ));
        Ok(Self {
            config,
            db,
            store,
            executor,
        })
    }

    /// The database backing the response cache and checkpoint ledger
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Crawl a query over a set of pre-sliced date chunks
    ///
    /// Chunks are processed in order. A chunk whose ledger key is already
    /// done is skipped without any network activity; a chunk that keeps
    /// failing after its retry budget is abandoned for this run and left
    /// uncheckpointed, so the next run picks it up again.
    pub async fn crawl(
        &self,
        query: &SearchQuery,
        chunks: &[DateInterval],
        transform: Option<&dyn ItemTransform>,
    ) -> Result<CrawlStats> {
        let mut stats = CrawlStats::default();

        for chunk in chunks {
            let key = chunk_key(&query.label, &query.range_field, chunk);
            if self.db.is_done(&key).await? {
                info!(label = %query.label, chunk = %chunk, "chunk already done");
                stats.units_skipped += 1;
                continue;
            }

            let mut attempt = 0;
            loop {
                attempt += 1;
                match self.crawl_interval(query, *chunk, transform).await {
                    Ok(chunk_stats) => {
                        self.db.mark_done(&key).await?;
                        stats.absorb(chunk_stats);
                        break;
                    }
                    Err(err) if attempt < self.config.crawl.unit_attempts => {
                        warn!(
                            label = %query.label,
                            chunk = %chunk,
                            attempt,
                            error = %err,
                            "chunk failed; retrying"
                        );
                        tokio::time::sleep(self.config.crawl.unit_retry_delay).await;
                    }
                    Err(err) => {
                        error!(
                            label = %query.label,
                            chunk = %chunk,
                            attempts = attempt,
                            error = %err,
                            "chunk abandoned for this run"
                        );
                        stats.units_abandoned += 1;
                        break;
                    }
                }
            }
        }

        info!(
            label = %query.label,
            windows = stats.windows,
            splits = stats.splits,
            items = stats.items_upserted,
            skipped_chunks = stats.units_skipped,
            abandoned_chunks = stats.units_abandoned,
            "crawl finished"
        );
        Ok(stats)
    }

    /// Drain one date interval without chunk-level checkpointing
    ///
    /// Window-level checkpoints and the response cache still apply, so a
    /// failed call can be repeated cheaply.
    pub async fn crawl_interval(
        &self,
        query: &SearchQuery,
        interval: DateInterval,
        transform: Option<&dyn ItemTransform>,
    ) -> Result<CrawlStats> {
        let partitioner = Partitioner {
            executor: &self.executor,
            db: &self.db,
            store: self.store.as_ref(),
            api: &self.config.api,
        };
        partitioner.drain_interval(query, interval, transform).await
    }

    /// Fetch the filter-limits document describing the API's searchable
    /// dimensions and their bounds
    pub async fn filter_limits(&self) -> Result<Value> {
        self.executor
            .execute(&RequestSpec::get(
                self.config.api.filter_limits_path.clone(),
                None,
            ))
            .await
    }

    /// Run a one-shot quick search and persist whatever items it returns
    ///
    /// Quick search is not paginated or partitioned; it is useful for spot
    /// checks and small follow-up lookups. Returns the raw response body.
    pub async fn quick_search(
        &self,
        query: &SearchQuery,
        transform: Option<&dyn ItemTransform>,
    ) -> Result<Value> {
        let body = (!query.filter.is_empty()).then(|| Value::Object(query.filter.clone()));
        let response = self
            .executor
            .execute(&RequestSpec::get(
                self.config.api.quick_search_path.clone(),
                body,
            ))
            .await?;

        let items = response
            .get("data")
            .unwrap_or(&response)
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for item in items {
            let item = match transform {
                Some(t) => t.transform(item),
                None => item,
            };
            let Some(record_id) = extract_record_id(&item, &query.id_field) else {
                warn!(
                    label = %query.label,
                    id_field = %query.id_field,
                    "quick search item is missing its identifier; skipped"
                );
                continue;
            };
            self.store.upsert(&record_id, item).await?;
        }

        Ok(response)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
