//! Tick source driving the poller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

#[async_trait]
pub trait Ticker: Send + Sync {
    /// Wait for the next tick and return the wall-clock time it fired at.
    async fn tick(&self) -> DateTime<Utc>;

    /// Release the underlying timer. Further ticks never fire.
    fn stop(&self);
}

/// Fixed-interval ticker. The first tick fires immediately; missed ticks are
/// skipped rather than bunched up.
pub struct IntervalTicker {
    interval: Mutex<Interval>,
    stopped: AtomicBool,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval: Mutex::new(interval),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&self) -> DateTime<Utc> {
        if self.is_stopped() {
            std::future::pending::<()>().await;
        }
        self.interval.lock().await.tick().await;
        Utc::now()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}
