//! Head stage: first page of every seed

use super::outlet::Outlet;
use super::source::PageSource;
use super::types::{CallNoError, GatherConfig, GatherStats, QueryError};
use crate::decode::Decoder;
use crate::http::Fetcher;
use crate::pagination::parse_cursor;
use crate::query::Query;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fetches page 1 of each seed and derives the remaining page descriptors
///
/// Seeds are handled one at a time, in arrival order. For each seed the
/// page-1 envelope is emitted before any of its derived descriptors is
/// enqueued.
pub struct HeadStage<F, D> {
    source: Arc<PageSource<F, D>>,
    config: GatherConfig,
    cancel: CancellationToken,
    stats: Arc<GatherStats>,
}

impl<F, D> HeadStage<F, D>
where
    F: Fetcher + 'static,
    D: Send + Sync + 'static,
{
    /// Create a head stage
    pub fn new(
        source: Arc<PageSource<F, D>>,
        config: GatherConfig,
        cancel: CancellationToken,
        stats: Arc<GatherStats>,
    ) -> Self {
        Self {
            source,
            config: config.normalized(),
            cancel,
            stats,
        }
    }

    /// Start consuming `seeds`
    ///
    /// Returns the stage's result streams and the derived-query stream.
    /// Both close once the seed stream is closed and drained.
    pub fn run<T, O>(
        self,
        mut seeds: mpsc::Receiver<Query>,
    ) -> (O::Streams, async_channel::Receiver<Query>)
    where
        T: Send + 'static,
        D: Decoder<T>,
        O: Outlet<T>,
    {
        let (outlet, streams) = O::open(&self.config);
        let (derived_tx, derived_rx) = async_channel::bounded(self.config.query_cap);

        tokio::spawn(async move {
            let mut seed_count = 0u64;
            while let Some(query) = seeds.recv().await {
                seed_count += 1;
                self.process_seed(query, &outlet, &derived_tx).await;
            }
            derived_tx.close();
            debug!("Head stage finished after {seed_count} seeds");
        });

        (streams, derived_rx)
    }

    async fn process_seed<T, O>(
        &self,
        query: Query,
        outlet: &O,
        derived: &async_channel::Sender<Query>,
    ) where
        T: Send + 'static,
        D: Decoder<T>,
        O: Outlet<T>,
    {
        let (headers, value) = match self.source.load::<T>(&query, &self.cancel).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch {}: {}", query, e);
                self.stats.add_failed();
                outlet.failure(QueryError::new(query, e)).await;
                return;
            }
        };

        let cursor = parse_cursor(&headers);
        self.stats.add_fetched();
        outlet
            .success(CallNoError {
                query: query.clone(),
                headers,
                value,
            })
            .await;

        let cursor = match cursor {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!("Invalid pagination headers for {}: {}", query, e);
                self.stats.add_failed();
                outlet.failure(QueryError::new(query, e)).await;
                return;
            }
        };

        let limit = self.config.total_pages_limit;
        let remaining = cursor.remaining_pages(limit);
        if remaining.is_empty() {
            debug!("No further pages for {}", query);
            return;
        }

        let beyond = cursor.pages_beyond(limit);
        if beyond > 0 {
            warn!(
                "{} reports {} pages, fetching only up to page {} ({} skipped)",
                query.path,
                cursor.total_pages.unwrap_or_default(),
                limit,
                beyond
            );
            self.stats.add_skipped(u64::from(beyond));
        }

        info!(
            "Discovered pages {}..={} for {}",
            remaining.start(),
            remaining.end(),
            query.path
        );

        for page in remaining {
            if self.cancel.is_cancelled() {
                debug!("Cancelled, not deriving page {page} of {}", query.path);
                break;
            }
            if derived.send(query.with_page(page)).await.is_err() {
                warn!(
                    "Derived query stream closed, dropping remaining pages of {}",
                    query.path
                );
                break;
            }
            self.stats.add_derived(1);
        }
    }
}
