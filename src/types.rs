//! Core types shared across the crawl engine

use serde_json::{Map, Value};

/// A logical search query: a fixed filter plus the field names the engine
/// needs to drive pagination and persistence
///
/// The engine treats the filter as opaque JSON merged into every request body.
/// `range_field` names the ordering dimension the partitioner subdivides
/// (sent as `{"min": "YYYY-MM-DD", "max": "YYYY-MM-DD"}`); `id_field` names
/// the item field that keys the record store.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    /// Label identifying this crawl in checkpoint keys and logs (e.g. "GET-ALL")
    pub label: String,

    /// Fixed filter fields merged into every search request body
    pub filter: Map<String, Value>,

    /// Name of the ordering-dimension field subdivided by the partitioner
    pub range_field: String,

    /// Name of the item field holding the record identifier
    pub id_field: String,
}

impl SearchQuery {
    /// Create a query with an empty filter
    pub fn new(
        label: impl Into<String>,
        range_field: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            filter: Map::new(),
            range_field: range_field.into(),
            id_field: id_field.into(),
        }
    }

    /// Add a fixed filter field
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.filter.insert(key.into(), value);
        self
    }
}

/// One page of search results extracted from a response body
///
/// Only `total` and `items` are modeled; everything else in the response is
/// domain-specific and passes through untouched.
#[derive(Clone, Debug)]
pub struct SearchPage {
    /// API-reported full count for the queried interval (independent of offset)
    pub total: u64,

    /// Items returned for this page
    pub items: Vec<Value>,
}

impl SearchPage {
    /// Extract a page from a response body
    ///
    /// Accepts both `{"data": {"total": .., "items": [..]}}` and a flat
    /// `{"total": .., "items": [..]}` layout. A missing or malformed `total`
    /// is a logical API error; missing `items` is treated as an empty page.
    pub fn from_response(response: &Value) -> crate::Result<Self> {
        let data = response.get("data").unwrap_or(response);

        let total = data
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| crate::Error::Api("response is missing a numeric 'total'".to_string()))?;

        let items = data
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(Self { total, items })
    }
}

/// Per-item transform applied between extraction and persistence
///
/// Callers use this to annotate items with crawl context (e.g. tagging each
/// record with the activity code or year bucket it was discovered under)
/// before they reach the record store. Absence means identity.
pub trait ItemTransform: Send + Sync {
    /// Transform one item
    fn transform(&self, item: Value) -> Value;
}

impl<F> ItemTransform for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn transform(&self, item: Value) -> Value {
        self(item)
    }
}

/// Counters accumulated over one crawl run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Search windows processed (requests issued or served from cache)
    pub windows: u64,

    /// Windows subdivided because their total exceeded the result cap
    pub splits: u64,

    /// Windows skipped because their checkpoint key was already done
    pub windows_skipped: u64,

    /// Top-level units skipped because their checkpoint key was already done
    pub units_skipped: u64,

    /// Top-level units abandoned after exhausting unit retries
    pub units_abandoned: u64,

    /// Items forwarded to the record store
    pub items_upserted: u64,
}

impl CrawlStats {
    /// Fold another stats block into this one
    pub fn absorb(&mut self, other: CrawlStats) {
        self.windows += other.windows;
        self.splits += other.splits;
        self.windows_skipped += other.windows_skipped;
        self.units_skipped += other.units_skipped;
        self.units_abandoned += other.units_abandoned;
        self.items_upserted += other.items_upserted;
    }
}
