//! Output formatting for scan and detection results.

use anyhow::Result;
use grapnel_common::{DetectResult, ProbeOutcome, ScanReport, Verdict};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// One row of direct-mode output.
#[derive(Debug, Clone, Serialize)]
pub struct DirectProbeRow {
    pub path: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DirectProbeRow {
    #[must_use]
    pub fn new(service: &str, method: &str, outcome: &ProbeOutcome) -> Self {
        Self {
            path: format!("/{service}/{method}"),
            verdict: outcome.verdict,
            code: outcome.code.clone(),
            message: outcome.message.clone(),
        }
    }
}

/// Render the human-readable scan summary.
#[must_use]
pub fn format_scan_human(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:=<52}", "");
    let _ = writeln!(out, "Target:   {}", report.target);
    let _ = writeln!(out, "Mode:     {}", report.scan_mode);
    let _ = writeln!(out, "Services: {}", report.service_count());
    let _ = writeln!(out, "{:=<52}", "");

    for service in &report.services {
        let _ = writeln!(out, "  - {service}");
        match report.methods_per_service.get(service) {
            Some(methods) if !methods.is_empty() => {
                for method in methods {
                    let _ = writeln!(out, "      {method}");
                }
            }
            _ => {
                let _ = writeln!(out, "      (no methods confirmed)");
            }
        }
    }

    if !report.health_status.is_empty() {
        let _ = writeln!(out, "\nHealth:");
        for (service, status) in &report.health_status {
            if service.is_empty() {
                let _ = writeln!(out, "  overall: {status}");
            } else {
                let _ = writeln!(out, "  {service}: {status}");
            }
        }
    }

    let _ = writeln!(
        out,
        "\nServer reflection: {}",
        if report.reflection_enabled {
            "enabled"
        } else {
            "not available"
        }
    );

    if !report.vulnerabilities.is_empty() {
        let _ = writeln!(out, "\nPotential issues:");
        for finding in &report.vulnerabilities {
            let _ = writeln!(out, "  - {finding}");
        }
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\nErrors:");
        for (key, message) in &report.errors {
            let _ = writeln!(out, "  {key}: {message}");
        }
    }

    out
}

/// One service path per line.
#[must_use]
pub fn format_scan_simple(report: &ScanReport) -> String {
    let mut out = String::new();
    for service in &report.services {
        let _ = writeln!(out, "{service}");
    }
    out
}

pub fn format_scan_json(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human-readable detect lines. Non-gRPC targets only show up when
/// `show_misses` is set.
#[must_use]
pub fn format_detect_human(results: &[DetectResult], show_misses: bool) -> String {
    let mut out = String::new();
    for result in results {
        if result.is_grpc {
            let _ = writeln!(
                out,
                "[+] {} - gRPC service detected ({}ms)",
                result.target, result.latency_ms
            );
        } else if show_misses {
            match &result.error {
                Some(error) => {
                    let _ = writeln!(out, "[-] {} - Not gRPC: {}", result.target, error);
                }
                None => {
                    let _ = writeln!(out, "[-] {} - Not gRPC", result.target);
                }
            }
        }
    }
    out
}

pub fn format_detect_json(results: &[DetectResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Human-readable direct-mode lines.
#[must_use]
pub fn format_direct_human(rows: &[DirectProbeRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = match row.verdict {
            Verdict::MethodConfirmed => match row.code.as_deref() {
                Some("Unauthenticated") => {
                    format!("[+] {} - method exists, requires authentication", row.path)
                }
                Some("PermissionDenied") => {
                    format!("[+] {} - method exists, permission denied", row.path)
                }
                _ => format!("[+] {} - method exists", row.path),
            },
            Verdict::MethodMissing => {
                format!("[~] {} - service exists, method not found", row.path)
            }
            Verdict::ServiceMissing => format!("[-] {} - service not found", row.path),
            Verdict::Ambiguous => format!(
                "[?] {} - inconclusive ({})",
                row.path,
                row.code.as_deref().unwrap_or("unknown status")
            ),
            Verdict::TransportError => match row.message.as_deref() {
                Some(message) if !message.is_empty() => {
                    format!("[!] {} - no usable response: {message}", row.path)
                }
                _ => format!("[!] {} - no usable response", row.path),
            },
        };
        let _ = writeln!(out, "{line}");
    }
    out
}

pub fn format_direct_json(rows: &[DirectProbeRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Write to the given file, or stdout when no path is set.
pub fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)?;
                }
            }
            std::fs::write(path, content)?;
            eprintln!("results written to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}
