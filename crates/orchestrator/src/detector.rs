//! Bulk gRPC detection across many targets.
//!
//! Same worker-pool shape as the candidate scan, but each unit of work is a
//! whole endpoint: connect, fire one health probe, classify. Defaults are
//! tuned for breadth (50 workers, 3 s per target).

use crate::progress::{spawn_ticker, ProgressTracker};
use chrono::Utc;
use grapnel_common::DetectResult;
use grapnel_transport::{ChannelOptions, TransportProbe};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

/// Port assumed when a detect target omits one.
pub const DEFAULT_DETECT_PORT: u16 = 443;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub threads: usize,
    /// Per-target deadline covering connect and the probe call.
    pub timeout: Duration,
    pub tls: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threads: 50,
            timeout: Duration::from_secs(3),
            tls: false,
        }
    }
}

/// Append the default port when the target has none.
#[must_use]
pub fn normalize_target(target: &str) -> String {
    if target.contains(':') {
        target.to_string()
    } else {
        format!("{target}:{DEFAULT_DETECT_PORT}")
    }
}

/// Probe every target with a bounded worker pool. Results come back in
/// completion order; every target yields exactly one result.
pub async fn detect_targets(
    targets: Vec<String>,
    config: &DetectorConfig,
    cancel: Arc<AtomicBool>,
) -> Vec<DetectResult> {
    let total = targets.len();
    if total == 0 {
        return Vec::new();
    }

    let queue = Arc::new(AsyncMutex::new(
        targets.into_iter().collect::<VecDeque<String>>(),
    ));
    let progress = Arc::new(ProgressTracker::new(total));
    let (tx, mut rx) = mpsc::channel::<DetectResult>(256);

    let channel_opts = ChannelOptions {
        tls: config.tls,
        connect_timeout: config.timeout,
        call_timeout: config.timeout,
    };

    let ticker = spawn_ticker(progress.clone(), "detect");

    let workers: Vec<_> = (0..config.threads.max(1))
        .map(|_| {
            let queue = queue.clone();
            let tx = tx.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();
            let opts = channel_opts.clone();
            let deadline = config.timeout;
            tokio::spawn(async move {
                let probe = TransportProbe::new(opts);
                loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let target = {
                        let mut queue = queue.lock().await;
                        queue.pop_front()
                    };
                    let Some(target) = target else { break };

                    let result = detect_one(&probe, &target, deadline).await;
                    progress.incr_processed();
                    if result.is_grpc {
                        progress.incr_found();
                    }
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(tx);

    let mut results = Vec::with_capacity(total);
    while let Some(result) = rx.recv().await {
        results.push(result);
    }

    for worker in workers {
        let _ = worker.await;
    }
    ticker.abort();
    progress.log_summary("detect");

    results
}

async fn detect_one(probe: &TransportProbe, target: &str, deadline: Duration) -> DetectResult {
    let endpoint = normalize_target(target);
    debug!(%endpoint, "detecting");

    // The probe enforces connect and call timeouts itself; this outer
    // deadline is the per-target ceiling.
    let outcome = match tokio::time::timeout(deadline, probe.probe(&endpoint)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            return DetectResult {
                target: target.to_string(),
                is_grpc: false,
                latency_ms: deadline.as_millis() as u64,
                error: Some("detection deadline elapsed".to_string()),
                timestamp: Utc::now(),
            }
        }
    };

    DetectResult {
        target: target.to_string(),
        is_grpc: outcome.is_grpc,
        latency_ms: outcome.latency.as_millis() as u64,
        error: if outcome.is_grpc {
            None
        } else {
            Some(outcome.reason)
        },
        timestamp: Utc::now(),
    }
}
