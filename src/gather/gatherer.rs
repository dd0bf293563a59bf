//! Gatherer facade

use super::head::HeadStage;
use super::outlet::{CombinedOutlet, Outlet, SegregatedOutlet};
use super::source::PageSource;
use super::tail::TailStage;
use super::types::{Call, CallNoError, GatherConfig, GatherStats, QueryError, StatsSnapshot};
use crate::decode::Decoder;
use crate::http::Fetcher;
use crate::query::Query;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fetches complete paginated collections
///
/// # Example
///
/// ```rust,ignore
/// use gitlab_gather::decode::JsonDecoder;
/// use gitlab_gather::gather::{collect_calls, Gatherer};
/// use gitlab_gather::http::HttpClient;
/// use gitlab_gather::query::Query;
///
/// let gatherer = Gatherer::new(HttpClient::new()?, JsonDecoder::<Vec<Project>>::new());
/// let calls = gatherer.gather_all(vec![Query::page_query("projects", 1)]);
/// for call in collect_calls(calls).await {
///     println!("{}: {:?}", call.query, call.result);
/// }
/// ```
pub struct Gatherer<F, D> {
    source: Arc<PageSource<F, D>>,
    config: GatherConfig,
    cancel: CancellationToken,
    stats: Arc<GatherStats>,
}

impl<F, D> Gatherer<F, D>
where
    F: Fetcher + 'static,
    D: Send + Sync + 'static,
{
    /// Create a gatherer with the default configuration
    pub fn new(fetcher: F, decoder: D) -> Self {
        Self {
            source: Arc::new(PageSource::new(fetcher, decoder)),
            config: GatherConfig::default(),
            cancel: CancellationToken::new(),
            stats: Arc::new(GatherStats::default()),
        }
    }

    /// Set the gather configuration
    #[must_use]
    pub fn with_config(mut self, config: GatherConfig) -> Self {
        self.config = config.normalized();
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the gather configuration
    pub fn config(&self) -> &GatherConfig {
        &self.config
    }

    /// Token that cancels every in-flight and pending fetch of this gatherer
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Counters accumulated over every gather run by this gatherer
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Gather with errors embedded in each envelope
    ///
    /// The returned stream closes once `seeds` is closed and every page has
    /// been answered.
    pub fn gather<T>(&self, seeds: mpsc::Receiver<Query>) -> mpsc::Receiver<Call<T>>
    where
        T: Send + 'static,
        D: Decoder<T>,
    {
        self.run::<T, CombinedOutlet<T>>(seeds)
    }

    /// Gather with errors on a separate stream
    ///
    /// Both streams must be drained concurrently: a full error stream
    /// stalls the pipeline.
    pub fn gather_dual<T>(
        &self,
        seeds: mpsc::Receiver<Query>,
    ) -> (mpsc::Receiver<CallNoError<T>>, mpsc::Receiver<QueryError>)
    where
        T: Send + 'static,
        D: Decoder<T>,
    {
        self.run::<T, SegregatedOutlet<T>>(seeds)
    }

    /// [`gather`](Self::gather) over a fixed list of seeds
    pub fn gather_all<T>(&self, seeds: Vec<Query>) -> mpsc::Receiver<Call<T>>
    where
        T: Send + 'static,
        D: Decoder<T>,
    {
        self.gather(self.feed(seeds))
    }

    /// [`gather_dual`](Self::gather_dual) over a fixed list of seeds
    pub fn gather_all_dual<T>(
        &self,
        seeds: Vec<Query>,
    ) -> (mpsc::Receiver<CallNoError<T>>, mpsc::Receiver<QueryError>)
    where
        T: Send + 'static,
        D: Decoder<T>,
    {
        self.gather_dual(self.feed(seeds))
    }

    fn run<T, O>(&self, seeds: mpsc::Receiver<Query>) -> O::Streams
    where
        T: Send + 'static,
        D: Decoder<T>,
        O: Outlet<T>,
    {
        let head = HeadStage::new(
            Arc::clone(&self.source),
            self.config,
            self.cancel.clone(),
            Arc::clone(&self.stats),
        );
        let tail = TailStage::new(
            Arc::clone(&self.source),
            self.config,
            self.cancel.clone(),
            Arc::clone(&self.stats),
        );

        let (head_streams, derived) = head.run::<T, O>(seeds);
        let tail_streams = tail.run::<T, O>(derived);
        O::merge(head_streams, tail_streams, &self.config)
    }

    fn feed(&self, seeds: Vec<Query>) -> mpsc::Receiver<Query> {
        let (tx, rx) = mpsc::channel(self.config.query_cap.max(1));
        tokio::spawn(async move {
            let total = seeds.len();
            for seed in seeds {
                if tx.send(seed).await.is_err() {
                    debug!("Seed stream closed before all {total} seeds were sent");
                    return;
                }
            }
        });
        rx
    }
}

/// Drain a combined result stream
pub async fn collect_calls<T>(mut calls: mpsc::Receiver<Call<T>>) -> Vec<Call<T>> {
    let mut collected = Vec::new();
    while let Some(call) = calls.recv().await {
        collected.push(call);
    }
    collected
}

/// Drain both streams of a dual gather concurrently
pub async fn collect_dual<T>(
    mut calls: mpsc::Receiver<CallNoError<T>>,
    mut errors: mpsc::Receiver<QueryError>,
) -> (Vec<CallNoError<T>>, Vec<QueryError>) {
    let successes = async {
        let mut collected = Vec::new();
        while let Some(call) = calls.recv().await {
            collected.push(call);
        }
        collected
    };
    let failures = async {
        let mut collected = Vec::new();
        while let Some(error) = errors.recv().await {
            collected.push(error);
        }
        collected
    };
    tokio::join!(successes, failures)
}
