//! Adaptive range partitioning over one date interval.
//!
//! The engine keeps an explicit stack of [`SearchWindow`]s instead of
//! recursing. Each popped window is resolved with a single search request:
//! an empty interval is checkpointed and dropped, an interval whose reported
//! total exceeds the result cap is halved and both children are pushed, and
//! anything else is paged by pushing the next offset until the interval is
//! drained.

use crate::config::ApiConfig;
use crate::db::Database;
use crate::error::Result;
use crate::executor::{RequestExecutor, RequestSpec};
use crate::store::RecordStore;
use crate::types::{CrawlStats, ItemTransform, SearchPage, SearchQuery};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::window::{DateInterval, SearchWindow, window_key};

/// Build the request body for one window: the query filter plus paging and
/// range-bound fields
pub(super) fn search_body(query: &SearchQuery, api: &ApiConfig, window: &SearchWindow) -> Value {
    let mut body = query.filter.clone();
    body.insert("limit".to_string(), json!(api.page_size));
    body.insert("skip".to_string(), json!(window.offset));
    body.insert(
        query.range_field.clone(),
        json!({
            "min": window.interval.start.to_string(),
            "max": window.interval.end.to_string(),
        }),
    );
    Value::Object(body)
}

pub(super) struct Partitioner<'a> {
    pub executor: &'a RequestExecutor,
    pub db: &'a Database,
    pub store: &'a dyn RecordStore,
    pub api: &'a ApiConfig,
}

impl Partitioner<'_> {
    /// Drain one root interval completely
    ///
    /// Returns the stats for this interval, or the first error that survived
    /// request-level retries. On error the stack state is discarded; a rerun
    /// rebuilds it from the root, replaying finished windows from the
    /// checkpoint ledger and the response cache.
    pub async fn drain_interval(
        &self,
        query: &SearchQuery,
        root: DateInterval,
        transform: Option<&dyn ItemTransform>,
    ) -> Result<CrawlStats> {
        let mut stats = CrawlStats::default();
        let mut stack = vec![SearchWindow::opening(root)];

        while let Some(window) = stack.pop() {
            // Results past the cap are truncated server-side; there is
            // nothing left to fetch at this offset
            if window.offset >= self.api.result_cap {
                continue;
            }

            let key = window_key(&query.label, &query.range_field, &window);
            if self.db.is_done(&key).await? {
                stats.windows_skipped += 1;
                continue;
            }

            let body = search_body(query, self.api, &window);
            let response = self
                .executor
                .execute(&RequestSpec::search(self.api.search_path.clone(), body))
                .await?;
            let page = SearchPage::from_response(&response)?;
            stats.windows += 1;

            info!(
                label = %query.label,
                from = %window.interval.start,
                to = %window.interval.end,
                offset = window.offset,
                total = page.total,
                left = stack.len(),
                "search window"
            );

            if page.total == 0 {
                self.db.mark_done(&key).await?;
                continue;
            }

            if page.total > self.api.result_cap && window.interval.is_divisible() {
                if let Some((first, second)) = window.interval.split() {
                    // Second half below so the first half is popped next
                    stack.push(SearchWindow::opening(second));
                    stack.push(SearchWindow::opening(first));
                    stats.splits += 1;
                }
                continue;
            }

            if page.total > self.api.result_cap {
                warn!(
                    label = %query.label,
                    day = %window.interval.start,
                    total = page.total,
                    cap = self.api.result_cap,
                    "single day exceeds the result cap; results past the cap are unreachable"
                );
            }

            for item in page.items {
                let item = match transform {
                    Some(t) => t.transform(item),
                    None => item,
                };
                let Some(record_id) = extract_record_id(&item, &query.id_field) else {
                    warn!(
                        label = %query.label,
                        id_field = %query.id_field,
                        "item is missing its identifier; skipped"
                    );
                    continue;
                };
                self.store.upsert(&record_id, item).await?;
                stats.items_upserted += 1;
            }

            let next_offset = window.offset + u64::from(self.api.page_size);
            if next_offset < page.total && next_offset < self.api.result_cap {
                stack.push(window.next(u64::from(self.api.page_size)));
            } else {
                // Terminal window of a drained interval. Earlier pages of the
                // interval are never checkpointed; on restart they replay
                // from the response cache and re-derive this continuation.
                self.db.mark_done(&key).await?;
            }
        }

        Ok(stats)
    }
}

/// Pull the record identifier out of an item; string and numeric
/// identifiers are both accepted
pub(super) fn extract_record_id(item: &Value, id_field: &str) -> Option<String> {
    match item.get(id_field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
