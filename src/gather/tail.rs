//! Tail stage: worker pool for derived pages

use super::outlet::Outlet;
use super::source::PageSource;
use super::types::{CallNoError, GatherConfig, GatherStats, QueryError};
use crate::decode::Decoder;
use crate::http::Fetcher;
use crate::query::Query;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed-size pool of workers fetching derived descriptors
///
/// Each worker takes descriptors off the shared queue until it is closed
/// and drained. The stage's streams close only after every worker has
/// exited.
pub struct TailStage<F, D> {
    source: Arc<PageSource<F, D>>,
    config: GatherConfig,
    cancel: CancellationToken,
    stats: Arc<GatherStats>,
}

impl<F, D> TailStage<F, D>
where
    F: Fetcher + 'static,
    D: Send + Sync + 'static,
{
    /// Create a tail stage
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

    /// Start `workers_cap` workers draining `queries`
    pub fn run<T, O>(self, queries: async_channel::Receiver<Query>) -> O::Streams
    where
        T: Send + 'static,
        D: Decoder<T>,
        O: Outlet<T>,
    {
        let (outlet, streams) = O::open(&self.config);
        let mut workers = JoinSet::new();

        for worker_id in 0..self.config.workers_cap {
            let queries = queries.clone();
            let outlet = outlet.clone();
            let source = Arc::clone(&self.source);
            let cancel = self.cancel.clone();
            let stats = Arc::clone(&self.stats);

            workers.spawn(async move {
                let mut handled = 0u64;
                while let Ok(query) = queries.recv().await {
                    handled += 1;
                    match source.load::<T>(&query, &cancel).await {
                        Ok((headers, value)) => {
                            debug!("Worker {worker_id} fetched {}", query);
                            stats.add_fetched();
                            outlet
                                .success(CallNoError {
                                    query,
                                    headers,
                                    value,
                                })
                                .await;
                        }
                        Err(e) => {
                            warn!("Worker {worker_id} failed to fetch {}: {}", query, e);
                            stats.add_failed();
                            outlet.failure(QueryError::new(query, e)).await;
                        }
                    }
                }
                debug!("Worker {worker_id} exiting after {handled} pages");
            });
        }
        drop(queries);

        // The outlet held here keeps the streams open until every worker is done.
        tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    warn!("Tail worker terminated abnormally: {e}");
                }
            }
            drop(outlet);
            debug!("All tail workers exited");
        });

        streams
    }
}
