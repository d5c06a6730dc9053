//! Per-target scan orchestration.
//!
//! State machine per target:
//!
//! ```text
//! CONNECTING -> PROBING_TRANSPORT -> {ABORTED | PROBING_REFLECTION}
//!            -> PROBING_CANDIDATES -> COMPLETE
//! ```
//!
//! The engine itself is written against the probe traits so the whole flow
//! runs in tests without a server; [`scan_endpoint`] wires the concrete
//! channel-backed probers in front of it.
//!
//! Concurrency shape: a fixed pool of `threads` workers drains a shared
//! candidate queue. Workers never touch the report; they send discoveries
//! over an mpsc queue to a single aggregator task, which owns every
//! mutation of the mutex-guarded [`ScanReport`]. Progress is plain atomics.

use crate::progress::{spawn_ticker, ProgressTracker};
use crate::vulns;
use chrono::Utc;
use dashmap::DashMap;
use grapnel_common::{
    Candidate, HealthProber, MethodProber, ReflectionProber, ScanMode, ScanOptions, ScanReport,
    Verdict,
};
use grapnel_oracle::GrpcMethodProber;
use grapnel_reflection::GrpcReflectionProbe;
use grapnel_transport::{connect, ChannelOptions, GrpcHealthProbe, TransportProbe};
use grapnel_wordlist::DEFAULT_METHODS;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

/// Well-known health service, recorded when the health sweep succeeds.
const HEALTH_SERVICE: &str = "grpc.health.v1.Health";

/// Facts about how this scan was configured, for mode reporting.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    pub wordlist_supplied: bool,
    /// Whether brute-force candidates (expansion of built-in words) were in
    /// the stream, as opposed to the bare seed.
    pub brute_enabled: bool,
    /// Forced mode for direct CLI probes.
    pub mode_override: Option<ScanMode>,
}

/// What a worker tells the aggregator. Service discoveries always precede
/// the methods confirmed for them, because the same worker sends both in
/// order over the same queue.
#[derive(Debug)]
enum Discovery {
    Service(String),
    Method { service: String, method: String },
}

/// Trait-level scan engine.
pub struct ScanEngine {
    prober: Arc<dyn MethodProber>,
    reflection: Option<Arc<dyn ReflectionProber>>,
    health: Option<Arc<dyn HealthProber>>,
    options: ScanOptions,
    cancel: Arc<AtomicBool>,
}

impl ScanEngine {
    #[must_use]
    pub fn new(prober: Arc<dyn MethodProber>, options: ScanOptions) -> Self {
        Self {
            prober,
            reflection: None,
            health: None,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_reflection(mut self, reflection: Arc<dyn ReflectionProber>) -> Self {
        self.reflection = Some(reflection);
        self
    }

    #[must_use]
    pub fn with_health(mut self, health: Arc<dyn HealthProber>) -> Self {
        self.health = Some(health);
        self
    }

    /// Share a cancellation flag (Ctrl-C, per-target deadline). Workers stop
    /// pulling new candidates once it is set; in-flight calls still finish.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the reflection and candidate phases against one target and
    /// return the finalized report.
    pub async fn scan(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
        ctx: &ScanContext,
    ) -> ScanReport {
        let start = Instant::now();
        let shared = Arc::new(Mutex::new(ScanReport::new(target)));

        // Per-target deadline: flip the shared cancel flag when it elapses
        // so dispatch stops and workers drain within the per-call timeout.
        let watchdog = self.options.scan_deadline.map(|deadline| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                warn!("scan deadline elapsed, cancelling dispatch");
                cancel.store(true, Ordering::Relaxed);
            })
        });

        // PROBING_REFLECTION
        let reflection_ok = self.run_reflection(&shared).await;

        // PROBING_CANDIDATES
        let queue = self.build_queue(candidates, &shared);
        let new_from_probing = self.run_candidate_pool(queue, &shared).await;

        // Standard health sweep, always performed regardless of mode.
        self.run_health_sweep(&shared).await;

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        if self.cancel.load(Ordering::Relaxed) {
            shared
                .lock()
                .record_error("cancelled", "scan stopped early; results are partial");
        }

        // COMPLETE
        let mut report = Arc::try_unwrap(shared)
            .map(Mutex::into_inner)
            .unwrap_or_else(|arc| arc.lock().clone());
        report.scan_mode = decide_mode(ctx, reflection_ok, new_from_probing, report.service_count());
        vulns::assess(&mut report);
        report.timestamp = Utc::now();
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            target,
            services = report.service_count(),
            mode = %report.scan_mode,
            "scan complete"
        );
        report
    }

    async fn run_reflection(&self, shared: &Arc<Mutex<ScanReport>>) -> bool {
        let Some(reflection) = &self.reflection else {
            return false;
        };

        let outcome = reflection.list_services().await;
        if let Some(error) = &outcome.error {
            debug!(%error, "reflection unavailable");
        }

        let mut report = shared.lock();
        report.reflection_enabled = outcome.enabled;
        if outcome.enabled {
            for service in &outcome.services {
                if report.add_service(service) {
                    info!(%service, "service discovered via reflection");
                }
            }
        }
        outcome.enabled
    }

    /// Assemble the probing queue: the provided candidates plus a
    /// default-method candidate for every reflection-discovered service not
    /// already covered, so their methods get confirmed too.
    fn build_queue(
        &self,
        candidates: Vec<Candidate>,
        shared: &Arc<Mutex<ScanReport>>,
    ) -> VecDeque<Candidate> {
        let mut queue: VecDeque<Candidate> = VecDeque::with_capacity(candidates.len());
        let known: Vec<String> = candidates.iter().map(|c| c.service.clone()).collect();
        queue.extend(candidates);

        let report = shared.lock();
        for service in &report.services {
            if !known.iter().any(|k| k == service) {
                queue.push_back(Candidate::new(
                    service.clone(),
                    DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
                    grapnel_common::CandidateOrigin::Reflection,
                ));
            }
        }
        queue
    }

    /// Drive the worker pool; returns how many services probing added that
    /// reflection had not already reported.
    async fn run_candidate_pool(
        &self,
        queue: VecDeque<Candidate>,
        shared: &Arc<Mutex<ScanReport>>,
    ) -> usize {
        let total = queue.len();
        if total == 0 {
            return 0;
        }

        let queue = Arc::new(AsyncMutex::new(queue));
        let confirmed_groups: Arc<DashMap<u64, ()>> = Arc::new(DashMap::new());
        let progress = Arc::new(ProgressTracker::new(total));
        let (tx, mut rx) = mpsc::channel::<Discovery>(256);

        // Single aggregator owns every report mutation.
        let aggregator = {
            let shared = shared.clone();
            tokio::spawn(async move {
                let mut new_services = 0usize;
                while let Some(discovery) = rx.recv().await {
                    let mut report = shared.lock();
                    match discovery {
                        Discovery::Service(name) => {
                            if report.add_service(&name) {
                                new_services += 1;
                                info!(service = %name, "service discovered");
                            }
                        }
                        Discovery::Method { service, method } => {
                            report.add_method(&service, &method);
                        }
                    }
                }
                new_services
            })
        };

        let ticker = spawn_ticker(progress.clone(), "probing");

        let workers: Vec<_> = (0..self.options.threads.max(1))
            .map(|_| {
                let queue = queue.clone();
                let prober = self.prober.clone();
                let tx = tx.clone();
                let confirmed_groups = confirmed_groups.clone();
                let progress = progress.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    worker_loop(queue, prober, tx, confirmed_groups, progress, cancel).await;
                })
            })
            .collect();
        drop(tx);

        for worker in workers {
            let _ = worker.await;
        }
        ticker.abort();
        progress.log_summary("probing");

        aggregator.await.unwrap_or(0)
    }

    async fn run_health_sweep(&self, shared: &Arc<Mutex<ScanReport>>) {
        let Some(health) = &self.health else {
            return;
        };

        match health.check(None).await {
            Ok(status) => {
                let mut report = shared.lock();
                report.set_health("", status.as_str());
                // A health reply proves the health service itself.
                report.add_method(HEALTH_SERVICE, "Check");
            }
            Err(e) => {
                debug!(error = %e, "overall health check failed");
                shared.lock().record_error("health_check", e.to_string());
            }
        }

        let services: Vec<String> = shared.lock().services.clone();
        for service in services {
            match health.check(Some(&service)).await {
                Ok(status) => shared.lock().set_health(service.as_str(), status.as_str()),
                Err(e) => debug!(%service, error = %e, "per-service health check failed"),
            }
        }
    }
}

/// One worker: pop, probe, report. Each worker owns one candidate at a
/// time; additional methods for a service are probed only after the service
/// discovery was queued, which preserves the ordering invariant.
async fn worker_loop(
    queue: Arc<AsyncMutex<VecDeque<Candidate>>>,
    prober: Arc<dyn MethodProber>,
    tx: mpsc::Sender<Discovery>,
    confirmed_groups: Arc<DashMap<u64, ()>>,
    progress: Arc<ProgressTracker>,
    cancel: Arc<AtomicBool>,
) {
    loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        let candidate = {
            let mut queue = queue.lock().await;
            queue.pop_front()
        };
        let Some(candidate) = candidate else { break };

        // Another variant of the same bare name already confirmed: the rest
        // of the group only produces duplicates or false positives.
        if let Some(group) = candidate.group {
            if confirmed_groups.contains_key(&group) {
                progress.incr_processed();
                continue;
            }
        }

        let Some(first) = candidate.methods.first() else {
            progress.incr_processed();
            continue;
        };

        let outcome = prober.probe(&candidate.service, first).await;
        progress.incr_processed();

        match outcome.verdict {
            Verdict::ServiceMissing | Verdict::TransportError | Verdict::Ambiguous => {
                debug!(
                    service = %candidate.service,
                    verdict = %outcome.verdict,
                    "candidate discarded"
                );
                continue;
            }
            Verdict::MethodMissing | Verdict::MethodConfirmed => {
                if let Some(group) = candidate.group {
                    confirmed_groups.insert(group, ());
                }
                progress.incr_found();

                if tx
                    .send(Discovery::Service(candidate.service.clone()))
                    .await
                    .is_err()
                {
                    return;
                }
                if outcome.verdict == Verdict::MethodConfirmed {
                    let _ = tx
                        .send(Discovery::Method {
                            service: candidate.service.clone(),
                            method: first.clone(),
                        })
                        .await;
                }

                // Service is in; sweep the remaining methods.
                for method in candidate.methods.iter().skip(1) {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let outcome = prober.probe(&candidate.service, method).await;
                    if outcome.verdict == Verdict::MethodConfirmed {
                        let _ = tx
                            .send(Discovery::Method {
                                service: candidate.service.clone(),
                                method: method.clone(),
                            })
                            .await;
                    }
                }
            }
        }
    }
}

/// Scan-mode selection for reporting.
fn decide_mode(
    ctx: &ScanContext,
    reflection_ok: bool,
    new_from_probing: usize,
    service_count: usize,
) -> ScanMode {
    if let Some(mode) = ctx.mode_override {
        return mode;
    }
    if ctx.wordlist_supplied {
        return ScanMode::Wordlist;
    }
    if reflection_ok && new_from_probing == 0 {
        return ScanMode::Reflection;
    }
    if !ctx.brute_enabled && service_count <= 1 {
        return ScanMode::Standard;
    }
    ScanMode::Bruteforce
}

/// Full per-target scan against a live endpoint: connect, classify the
/// transport, then run the engine with channel-backed probers.
pub async fn scan_endpoint(
    target: &str,
    options: &ScanOptions,
    candidates: Vec<Candidate>,
    ctx: &ScanContext,
    cancel: Arc<AtomicBool>,
) -> ScanReport {
    let channel_opts = ChannelOptions {
        tls: options.tls,
        connect_timeout: options.connect_timeout,
        call_timeout: options.call_timeout,
    };

    // CONNECTING
    let start = Instant::now();
    let channel = match connect(target, &channel_opts).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!(target, error = %e, "connection failed");
            return aborted_report(target, ctx, "connect", &e.to_string(), start);
        }
    };

    // PROBING_TRANSPORT
    let transport = TransportProbe::new(channel_opts);
    let (is_grpc, reason) = transport.classify_channel(&channel).await;
    if !is_grpc {
        info!(target, %reason, "peer does not speak gRPC, aborting scan");
        return aborted_report(target, ctx, "probe", &reason, start);
    }

    let prober = Arc::new(GrpcMethodProber::new(
        channel.clone(),
        options.call_timeout,
        options.strict,
    ));
    let reflection = Arc::new(GrpcReflectionProbe::new(
        channel.clone(),
        options.call_timeout,
    ));
    let health = Arc::new(GrpcHealthProbe::new(channel, options.call_timeout));

    let engine = ScanEngine::new(prober, options.clone())
        .with_reflection(reflection)
        .with_health(health)
        .with_cancel(cancel);

    engine.scan(target, candidates, ctx).await
}

fn aborted_report(
    target: &str,
    ctx: &ScanContext,
    key: &str,
    message: &str,
    start: Instant,
) -> ScanReport {
    let mut report = ScanReport::new(target);
    report.record_error(key, message);
    report.scan_mode = decide_mode(ctx, false, 0, 0);
    report.timestamp = Utc::now();
    report.duration_ms = start.elapsed().as_millis() as u64;
    report
}
