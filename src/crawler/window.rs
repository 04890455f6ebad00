//! Date intervals and paging windows for the adaptive partitioner.

use chrono::{Days, NaiveDate};
use std::fmt;

/// Inclusive date interval, the unit the partitioner splits and pages over
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateInterval {
    /// First day covered, inclusive
    pub start: NaiveDate,
    /// Last day covered, inclusive
    pub end: NaiveDate,
}

impl DateInterval {
    /// Build an interval; `start` must not come after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of whole days between the bounds (zero for a single day)
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// A single-day interval cannot be halved any further
    pub fn is_divisible(&self) -> bool {
        self.span_days() >= 1
    }

    /// Halve the interval at its midpoint
    ///
    /// The two halves cover the original exactly, with no overlap and no
    /// gap. Returns `None` for a single-day interval.
    pub fn split(&self) -> Option<(DateInterval, DateInterval)> {
        if !self.is_divisible() {
            return None;
        }
        let mid = self.start + Days::new((self.span_days() / 2) as u64);
        let first = DateInterval {
            start: self.start,
            end: mid,
        };
        let second = DateInterval {
            start: mid + Days::new(1),
            end: self.end,
        };
        Some((first, second))
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <> {}", self.start, self.end)
    }
}

/// One page of results within an interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    /// The interval this window pages over
    pub interval: DateInterval,
    /// Result offset within the interval, a multiple of the page size
    pub offset: u64,
}

impl SearchWindow {
    /// The first window of an interval
    pub fn opening(interval: DateInterval) -> Self {
        Self {
            interval,
            offset: 0,
        }
    }

    /// The window `page_size` results after this one
    pub fn next(&self, page_size: u64) -> Self {
        Self {
            interval: self.interval,
            offset: self.offset + page_size,
        }
    }
}

/// Ledger key for a whole configured chunk of a query
pub fn chunk_key(label: &str, range_field: &str, interval: &DateInterval) -> String {
    format!("{label} > {range_field}: {interval}")
}

/// Ledger key for a single paging window within an interval
pub fn window_key(label: &str, range_field: &str, window: &SearchWindow) -> String {
    format!(
        "{label} > {range_field}: {}..{} @{}",
        window.interval.start, window.interval.end, window.offset
    )
}
