//! Fan-in merger for bounded streams

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Merges several receivers into one
///
/// Values are relayed as soon as any input yields one; inputs are polled
/// in turn so an idle input never blocks a busy one. Order within each
/// input is preserved. The output closes once every input has closed.
#[derive(Debug, Clone, Copy)]
pub struct FanIn {
    capacity: usize,
}

impl FanIn {
    /// Create a merger whose output holds up to `capacity` values
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Start relaying `inputs` into a new output receiver
    ///
    /// Must be called from within a tokio runtime.
    pub fn run<T: Send + 'static>(self, inputs: Vec<mpsc::Receiver<T>>) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let sources = inputs.len();
        let mut merged = stream::select_all(inputs.into_iter().map(ReceiverStream::new));

        tokio::spawn(async move {
            let mut relayed = 0u64;
            while let Some(item) = merged.next().await {
                if tx.send(item).await.is_err() {
                    debug!("Fan-in output dropped after {relayed} values");
                    return;
                }
                relayed += 1;
            }
            debug!("Fan-in of {sources} inputs closed after {relayed} values");
        });

        rx
    }
}
