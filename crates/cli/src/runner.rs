//! Wiring between the CLI surface and the engine crates.

use crate::output::{
    emit, format_detect_human, format_detect_json, format_direct_human, format_direct_json,
    format_scan_human, format_scan_json, format_scan_simple, DirectProbeRow,
};
use anyhow::{anyhow, bail, Context, Result};
use grapnel_common::{MethodProber, ProbeOutcome, ScanOptions, Verdict};
use grapnel_oracle::GrpcMethodProber;
use grapnel_orchestrator::{detect_targets, scan_endpoint, DetectorConfig, ScanContext};
use grapnel_transport::{connect, ChannelOptions};
use grapnel_wordlist::{generate, load_methods_file, GeneratorConfig, Wordlist, DEFAULT_METHODS};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Cancellation flag flipped by Ctrl-C; partial results are still emitted.
fn interrupt_flag() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight probes");
            flag.store(true, Ordering::Relaxed);
        }
    });
    cancel
}

pub struct ScanArgs {
    pub target: String,
    pub wordlist: Option<PathBuf>,
    pub methods: Option<PathBuf>,
    pub threads: usize,
    pub timeout: u64,
    pub connect_timeout: u64,
    pub deadline: Option<u64>,
    pub no_patterns: bool,
    pub no_brute: bool,
    pub fuzz_versions: bool,
    pub max_version: u32,
    pub method_limit: usize,
    pub tls: bool,
    pub strict: bool,
    pub simple: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
}

pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let wordlist = match &args.wordlist {
        Some(path) => Some(
            Wordlist::load(path)
                .with_context(|| format!("loading wordlist {}", path.display()))?,
        ),
        None => None,
    };
    let extra_methods = match &args.methods {
        Some(path) => load_methods_file(path)
            .with_context(|| format!("loading methods file {}", path.display()))?,
        None => Vec::new(),
    };

    let generator = GeneratorConfig {
        patterns: !args.no_patterns,
        brute: !args.no_brute,
        fuzz_versions: args.fuzz_versions,
        max_version: args.max_version,
        method_limit: args.method_limit,
        extra_methods,
    };
    let candidates = generate(wordlist.as_ref(), &generator);
    info!(
        target = %args.target,
        candidates = candidates.len(),
        threads = args.threads,
        "starting scan"
    );

    let options = ScanOptions {
        threads: args.threads,
        call_timeout: Duration::from_secs(args.timeout),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        scan_deadline: args.deadline.map(Duration::from_secs),
        tls: args.tls,
        strict: args.strict,
    };
    let ctx = ScanContext {
        wordlist_supplied: wordlist.as_ref().is_some_and(Wordlist::has_entries),
        brute_enabled: generator.brute,
        mode_override: None,
    };

    let report = scan_endpoint(&args.target, &options, candidates, &ctx, interrupt_flag()).await;

    let content = if args.json {
        format_scan_json(&report)?
    } else if args.simple {
        format_scan_simple(&report)
    } else {
        format_scan_human(&report)
    };
    emit(&content, args.output.as_deref())
}

pub struct DirectArgs {
    pub target: String,
    pub call: Option<String>,
    pub service: Option<String>,
    pub method: Option<String>,
    pub timeout: u64,
    pub tls: bool,
    pub strict: bool,
    pub json: bool,
}

pub async fn run_direct(args: DirectArgs) -> Result<()> {
    let pairs = direct_pairs(&args)?;

    let channel_opts = ChannelOptions {
        tls: args.tls,
        connect_timeout: Duration::from_secs(args.timeout),
        call_timeout: Duration::from_secs(args.timeout),
    };
    // A dead target is fatal for that target only, never for the
    // invocation; every requested path still gets a row.
    let rows = match connect(&args.target, &channel_opts).await {
        Ok(channel) => {
            let prober = GrpcMethodProber::new(channel, channel_opts.call_timeout, args.strict);
            let mut rows = Vec::with_capacity(pairs.len());
            for (service, method) in &pairs {
                let outcome = prober.probe(service, method).await;
                rows.push(DirectProbeRow::new(service, method, &outcome));
            }
            rows
        }
        Err(e) => {
            warn!(target = %args.target, error = %e, "connection failed");
            let outcome = ProbeOutcome::new(Verdict::TransportError)
                .with_status("Unavailable".to_string(), e.to_string());
            pairs
                .iter()
                .map(|(service, method)| DirectProbeRow::new(service, method, &outcome))
                .collect()
        }
    };

    let content = if args.json {
        format_direct_json(&rows)?
    } else {
        format_direct_human(&rows)
    };
    emit(&content, None)
}

/// Build the `(service, method)` pairs for direct mode: either one `--call`
/// spec, or the cross product of the `--service` and `--method` lists.
fn direct_pairs(args: &DirectArgs) -> Result<Vec<(String, String)>> {
    if let Some(call) = &args.call {
        let (service, method) = parse_call_spec(call)?;
        return Ok(vec![(service, method)]);
    }

    let services: Vec<String> = args
        .service
        .as_deref()
        .map(split_list)
        .unwrap_or_default();
    if services.is_empty() {
        bail!("direct mode needs --call or --service");
    }

    let methods: Vec<String> = match args.method.as_deref() {
        Some(list) => split_list(list),
        None => DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
    };
    if methods.is_empty() {
        bail!("--method was given but holds no method names");
    }

    let mut pairs = Vec::with_capacity(services.len() * methods.len());
    for service in &services {
        for method in &methods {
            pairs.push((service.clone(), method.clone()));
        }
    }
    Ok(pairs)
}

/// `Service/Method`, or `Service.Method` split on the last dot.
fn parse_call_spec(spec: &str) -> Result<(String, String)> {
    let (service, method) = if let Some((service, method)) = spec.split_once('/') {
        (service, method)
    } else if let Some((service, method)) = spec.rsplit_once('.') {
        (service, method)
    } else {
        return Err(anyhow!(
            "cannot parse '{spec}': expected Service/Method or Service.Method"
        ));
    };

    if service.is_empty() || method.is_empty() {
        bail!("cannot parse '{spec}': empty service or method");
    }
    Ok((service.to_string(), method.to_string()))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct DetectArgs {
    pub target: Option<String>,
    pub targets: Option<PathBuf>,
    pub threads: usize,
    pub timeout: u64,
    pub tls: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

pub async fn run_detect(args: DetectArgs) -> Result<()> {
    let targets = collect_targets(args.target.as_deref(), args.targets.as_deref())?;
    if targets.is_empty() {
        bail!("no targets provided; use --target, --targets or pipe via stdin");
    }

    info!(targets = targets.len(), threads = args.threads, "starting detection");

    let config = DetectorConfig {
        threads: args.threads,
        timeout: Duration::from_secs(args.timeout),
        tls: args.tls,
    };
    let results = detect_targets(targets, &config, interrupt_flag()).await;

    let found = results.iter().filter(|r| r.is_grpc).count();
    eprintln!(
        "[*] detection complete: {found}/{} targets speak gRPC",
        results.len()
    );

    let content = if args.json {
        format_detect_json(&results)?
    } else {
        format_detect_human(&results, args.verbose)
    };
    emit(&content, args.output.as_deref())
}

/// Targets come from the flag, a file, or stdin: one per line, `#`
/// comments and blanks skipped.
fn collect_targets(single: Option<&str>, file: Option<&Path>) -> Result<Vec<String>> {
    let mut targets = Vec::new();

    if let Some(target) = single {
        targets.push(target.to_string());
    }

    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading targets file {}", path.display()))?;
        targets.extend(parse_target_lines(text.lines()));
    }

    if targets.is_empty() {
        let stdin = std::io::stdin();
        let lines: Vec<String> = stdin.lock().lines().collect::<std::io::Result<_>>()?;
        targets.extend(parse_target_lines(lines.iter().map(String::as_str)));
    }

    Ok(targets)
}

fn parse_target_lines<'a, I: Iterator<Item = &'a str>>(lines: I) -> Vec<String> {
    lines
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
