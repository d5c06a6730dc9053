//! Post-scan observations layered on the aggregated result.
//!
//! These are simple string flags, not findings with severities: sensitive
//! service names, reflection exposure, and non-serving health states.

use grapnel_common::ScanReport;

const SENSITIVE_MARKERS: &[&str] = &["debug", "admin", "internal"];

/// Append vulnerability observations to a completed report.
pub fn assess(report: &mut ScanReport) {
    let mut flags = Vec::new();

    for service in &report.services {
        let lower = service.to_lowercase();
        if SENSITIVE_MARKERS.iter().any(|m| lower.contains(m)) {
            flags.push(format!("Potentially sensitive service exposed: {service}"));
        }
    }

    if report.reflection_enabled {
        flags.push("Server reflection is enabled, which may expose service details".to_string());
    }

    for (service, status) in &report.health_status {
        if status != "SERVING" {
            let name = if service.is_empty() {
                "Overall server"
            } else {
                service.as_str()
            };
            flags.push(format!("{name} reported non-serving health status: {status}"));
        }
    }

    report.vulnerabilities.extend(flags);
}
