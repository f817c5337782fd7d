use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Engine, EngineError};
use crate::schema::PageMeta;
use crate::ticker::Ticker;

/// Stop signal for [`Engine::start_scheduler`]: a cancellation token plus an
/// optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    pub token: CancellationToken,
    pub deadline: Option<Instant>,
}

impl Shutdown {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The shutdown error, if the signal has already fired.
    pub fn check(&self) -> Option<EngineError> {
        if self.token.is_cancelled() {
            return Some(EngineError::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(EngineError::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Stops the ticker when the scheduler returns or unwinds.
struct StopOnDrop<'a>(&'a dyn Ticker);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

impl Engine {
    /// Poll for due rules and report configs on every tick until shut down.
    ///
    /// Always returns [`EngineError::Cancelled`] or
    /// [`EngineError::DeadlineExceeded`]; store failures during a tick are
    /// logged and retried on the next one. A tick already in progress runs
    /// to completion. The ticker is stopped on every exit path.
    pub async fn start_scheduler(&self, shutdown: Shutdown, ticker: &dyn Ticker) -> EngineError {
        let _stop = StopOnDrop(ticker);
        if let Some(err) = shutdown.check() {
            return err;
        }
        info!("scheduler started");

        let deadline = async {
            match shutdown.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let err = loop {
            tokio::select! {
                biased;
                _ = shutdown.token.cancelled() => break EngineError::Cancelled,
                _ = &mut deadline => break EngineError::DeadlineExceeded,
                now = ticker.tick() => {
                    if let Some(err) = shutdown.check() {
                        break err;
                    }
                    self.run_tick(now).await;
                }
            }
        };
        info!(reason = %err, "scheduler stopped");
        err
    }

    /// One poll: fire rules and report configs due at or before `now`.
    pub async fn run_tick(&self, now: DateTime<Utc>) {
        let due = PageMeta::due(now);
        if let Err(e) = self.fire_due_rules(&due, now).await {
            warn!(error = %e, "due rule query failed");
        }
        if let Err(e) = self.fire_due_reports(&due, now).await {
            warn!(error = %e, "due report query failed");
        }
    }
}
