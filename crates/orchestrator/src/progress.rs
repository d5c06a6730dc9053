//! Progress tracking.
//!
//! Counters are plain atomics so workers never block on bookkeeping; the
//! optional wall-clock ticker reads them racily, which is fine for display.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::info;

pub struct ProgressTracker {
    total: AtomicUsize,
    processed: AtomicUsize,
    found: AtomicUsize,
    started: Instant,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total: AtomicUsize::new(total),
            processed: AtomicUsize::new(0),
            found: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn incr_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn incr_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn found(&self) -> usize {
        self.found.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Items processed per second since construction.
    #[must_use]
    pub fn rate(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.processed() as f64 / elapsed
        }
    }

    pub fn log_summary(&self, what: &str) {
        info!(
            "{} complete: {}/{} processed, {} found ({:.0}/sec)",
            what,
            self.processed(),
            self.total(),
            self.found(),
            self.rate()
        );
    }
}

/// Emit a progress line every second until the returned handle is aborted.
pub fn spawn_ticker(progress: Arc<ProgressTracker>, what: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await; // first tick fires immediately, skip it
        loop {
            interval.tick().await;
            info!(
                "{}: {}/{} checked ({:.0}/sec) | found: {}",
                what,
                progress.processed(),
                progress.total(),
                progress.rate(),
                progress.found()
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let progress = ProgressTracker::new(10);
        progress.incr_processed();
        progress.incr_processed();
        progress.incr_found();
        assert_eq!(progress.processed(), 2);
        assert_eq!(progress.found(), 1);
        assert_eq!(progress.total(), 10);
    }

    #[tokio::test]
    async fn ticker_can_be_aborted() {
        let progress = Arc::new(ProgressTracker::new(1));
        let handle = spawn_ticker(progress, "test");
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
