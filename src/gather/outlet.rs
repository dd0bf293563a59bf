//! Outlets: where a stage puts its envelopes
//!
//! The stages only know how to report a success or a failure for a
//! descriptor. The outlet decides whether errors travel inside the result
//! envelope or on a stream of their own.

use super::fan_in::FanIn;
use super::types::{Call, CallNoError, GatherConfig, QueryError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Error-channel shape of a gather
#[async_trait]
pub trait Outlet<T: Send + 'static>: Clone + Send + Sync + 'static {
    /// Receiving side handed to the caller
    type Streams: Send + 'static;

    /// Create a connected outlet/streams pair
    fn open(config: &GatherConfig) -> (Self, Self::Streams);

    /// Merge the streams of two stages into one
    fn merge(
        first: Self::Streams,
        second: Self::Streams,
        config: &GatherConfig,
    ) -> Self::Streams;

    /// Report a fetched page
    async fn success(&self, call: CallNoError<T>);

    /// Report a failed descriptor
    async fn failure(&self, error: QueryError);
}

// ============================================================================
// Combined Outlet
// ============================================================================

/// Errors embedded in each [`Call`]
pub struct CombinedOutlet<T> {
    calls: mpsc::Sender<Call<T>>,
}

impl<T> Clone for CombinedOutlet<T> {
    fn clone(&self) -> Self {
        Self {
            calls: self.calls.clone(),
        }
    }
}

impl<T: Send + 'static> CombinedOutlet<T> {
    async fn send(&self, call: Call<T>) {
        if let Err(e) = self.calls.send(call).await {
            debug!("Result receiver dropped, discarding {}", e.0.query);
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Outlet<T> for CombinedOutlet<T> {
    type Streams = mpsc::Receiver<Call<T>>;

    fn open(config: &GatherConfig) -> (Self, Self::Streams) {
        let (calls, rx) = mpsc::channel(config.call_cap.max(1));
        (Self { calls }, rx)
    }

    fn merge(
        first: Self::Streams,
        second: Self::Streams,
        config: &GatherConfig,
    ) -> Self::Streams {
        FanIn::new(config.call_cap).run(vec![first, second])
    }

    async fn success(&self, call: CallNoError<T>) {
        self.send(call.into()).await;
    }

    async fn failure(&self, error: QueryError) {
        self.send(error.into()).await;
    }
}

// ============================================================================
// Segregated Outlet
// ============================================================================

/// Successes and errors on separate streams
pub struct SegregatedOutlet<T> {
    calls: mpsc::Sender<CallNoError<T>>,
    errors: mpsc::Sender<QueryError>,
}

impl<T> Clone for SegregatedOutlet<T> {
    fn clone(&self) -> Self {
        Self {
            calls: self.calls.clone(),
            errors: self.errors.clone(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Outlet<T> for SegregatedOutlet<T> {
    type Streams = (mpsc::Receiver<CallNoError<T>>, mpsc::Receiver<QueryError>);

    fn open(config: &GatherConfig) -> (Self, Self::Streams) {
        let (calls, calls_rx) = mpsc::channel(config.call_cap.max(1));
        let (errors, errors_rx) = mpsc::channel(config.error_cap.max(1));
        (Self { calls, errors }, (calls_rx, errors_rx))
    }

    fn merge(
        first: Self::Streams,
        second: Self::Streams,
        config: &GatherConfig,
    ) -> Self::Streams {
        let calls = FanIn::new(config.call_cap).run(vec![first.0, second.0]);
        let errors = FanIn::new(config.error_cap).run(vec![first.1, second.1]);
        (calls, errors)
    }

    async fn success(&self, call: CallNoError<T>) {
        if let Err(e) = self.calls.send(call).await {
            debug!("Result receiver dropped, discarding {}", e.0.query);
        }
    }

    async fn failure(&self, error: QueryError) {
        if let Err(e) = self.errors.send(error).await {
            debug!("Error receiver dropped, discarding {}", e.0);
        }
    }
}
