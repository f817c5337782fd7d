//! Bounded delivery of [`RunInfo`] records to an external recorder.
//!
//! Firing paths must never stall on a slow or missing consumer, so a record
//! that cannot be queued within the send timeout is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::debug;

use crate::schema::RunInfo;

#[derive(Clone)]
pub struct RunInfoSink {
    tx: Option<mpsc::Sender<RunInfo>>,
    send_timeout: Duration,
    dropped: Arc<AtomicU64>,
}

impl RunInfoSink {
    /// Create a sink and the receiver the recorder reads from.
    pub fn channel(capacity: usize, send_timeout: Duration) -> (Self, mpsc::Receiver<RunInfo>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            tx: Some(tx),
            send_timeout,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// A sink with no consumer. Records are discarded without counting.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            send_timeout: Duration::ZERO,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Log the record, then queue it, waiting at most the send timeout.
    pub async fn record(&self, info: RunInfo) {
        info.log();
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.send_timeout(info, self.send_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(info)) | Err(SendTimeoutError::Closed(info)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    kind = %info.kind,
                    id = %info.entity_id,
                    dropped_total = total,
                    "run info dropped"
                );
            }
        }
    }

    /// Records dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
