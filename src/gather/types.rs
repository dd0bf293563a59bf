//! Envelope, configuration and statistics types

use crate::error::{Error, Result};
use crate::query::{PageKey, Query};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Envelopes
// ============================================================================

/// Result of one page fetch, with the error embedded
#[derive(Debug)]
pub struct Call<T> {
    /// Descriptor that produced this envelope
    pub query: Query,
    /// Response headers, when a response was received
    pub headers: Option<HeaderMap>,
    /// Decoded page or the error that prevented it
    pub result: Result<T>,
}

impl<T> Call<T> {
    /// Check whether the page was fetched and decoded
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Decoded page, if any
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Error, if any
    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Identity of the page this envelope answers
    pub fn key(&self) -> PageKey {
        self.query.key()
    }

    /// Split into the segregated shapes
    pub fn into_result(self) -> std::result::Result<CallNoError<T>, QueryError> {
        match self.result {
            Ok(value) => Ok(CallNoError {
                query: self.query,
                headers: self.headers.unwrap_or_default(),
                value,
            }),
            Err(source) => Err(QueryError {
                query: self.query,
                source,
            }),
        }
    }
}

impl<T> From<CallNoError<T>> for Call<T> {
    fn from(call: CallNoError<T>) -> Self {
        Self {
            query: call.query,
            headers: Some(call.headers),
            result: Ok(call.value),
        }
    }
}

impl<T> From<QueryError> for Call<T> {
    fn from(error: QueryError) -> Self {
        Self {
            query: error.query,
            headers: None,
            result: Err(error.source),
        }
    }
}

/// Successful page fetch
#[derive(Debug, Clone)]
pub struct CallNoError<T> {
    /// Descriptor that produced this page
    pub query: Query,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded page
    pub value: T,
}

impl<T> CallNoError<T> {
    /// Take the decoded page
    pub fn into_value(self) -> T {
        self.value
    }

    /// Identity of this page
    pub fn key(&self) -> PageKey {
        self.query.key()
    }
}

/// Failure attached to the descriptor that caused it
#[derive(Debug, thiserror::Error)]
#[error("{query}: {source}")]
pub struct QueryError {
    /// Descriptor whose fetch failed
    pub query: Query,
    /// Underlying error
    pub source: Error,
}

impl QueryError {
    /// Attach an error to a descriptor
    pub fn new(query: Query, source: Error) -> Self {
        Self { query, source }
    }

    /// Descriptor whose fetch failed
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Identity of the failed page
    pub fn key(&self) -> PageKey {
        self.query.key()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Channel capacities, pool size and page ceiling of a gather
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatherConfig {
    /// Capacity of each result stream
    pub call_cap: usize,
    /// Capacity of the seed and derived-query streams
    pub query_cap: usize,
    /// Number of tail workers
    pub workers_cap: usize,
    /// Capacity of each error stream (segregated shape only)
    pub error_cap: usize,
    /// Highest page number ever requested; `0` means unlimited
    pub total_pages_limit: u32,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            call_cap: 5,
            query_cap: 5,
            workers_cap: 5,
            error_cap: 1,
            total_pages_limit: 0,
        }
    }
}

impl GatherConfig {
    /// Set the result stream capacity
    #[must_use]
    pub fn call_cap(mut self, cap: usize) -> Self {
        self.call_cap = cap;
        self
    }

    /// Set the query stream capacity
    #[must_use]
    pub fn query_cap(mut self, cap: usize) -> Self {
        self.query_cap = cap;
        self
    }

    /// Set the number of tail workers
    #[must_use]
    pub fn workers_cap(mut self, workers: usize) -> Self {
        self.workers_cap = workers;
        self
    }

    /// Set the error stream capacity
    #[must_use]
    pub fn error_cap(mut self, cap: usize) -> Self {
        self.error_cap = cap;
        self
    }

    /// Set the page ceiling (`0` = unlimited)
    #[must_use]
    pub fn total_pages_limit(mut self, limit: u32) -> Self {
        self.total_pages_limit = limit;
        self
    }

    /// Copy with every capacity raised to at least one
    ///
    /// Bounded channels cannot have zero capacity.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            call_cap: self.call_cap.max(1),
            query_cap: self.query_cap.max(1),
            workers_cap: self.workers_cap.max(1),
            error_cap: self.error_cap.max(1),
            total_pages_limit: self.total_pages_limit,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Live counters shared by every stage of a gatherer
#[derive(Debug, Default)]
pub struct GatherStats {
    fetched: AtomicU64,
    failed: AtomicU64,
    derived: AtomicU64,
    skipped: AtomicU64,
}

impl GatherStats {
    pub(crate) fn add_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_derived(&self, count: u64) {
        self.derived.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn add_skipped(&self, count: u64) {
        self.skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            derived: self.derived.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Counters read from [`GatherStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Pages fetched and decoded
    pub fetched: u64,
    /// Error envelopes emitted
    pub failed: u64,
    /// Descriptors derived from cursors
    pub derived: u64,
    /// Pages never requested because of the page ceiling
    pub skipped: u64,
}
