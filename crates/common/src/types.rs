//! Core data types for the Grapnel discovery engine.
//!
//! Everything that crosses a crate boundary lives here: probe verdicts,
//! candidate descriptions, and the per-target result aggregates. The
//! aggregates are plain data; the mutation rules (dedup, insertion order)
//! are enforced by the methods on [`ScanReport`] so concurrent writers
//! cannot violate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// How a scan arrived at its service list, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Reflection,
    Standard,
    Wordlist,
    Bruteforce,
    Direct,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanMode::Reflection => "reflection",
            ScanMode::Standard => "standard",
            ScanMode::Wordlist => "wordlist",
            ScanMode::Bruteforce => "bruteforce",
            ScanMode::Direct => "direct",
        };
        f.write_str(s)
    }
}

/// Classification of a single `service/method` probe response.
///
/// The server never answers "yes, this exists"; existence is inferred from
/// error semantics. The only reliable negative is an explicit
/// "unknown service" message, and every handler-level rejection is a
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Explicit "unknown service": the path's service does not exist.
    ServiceMissing,
    /// The service routed but the method did not, so the service exists.
    MethodMissing,
    /// The method was dispatched to a handler: service and method exist.
    MethodConfirmed,
    /// A status that proves nothing either way; never recorded.
    Ambiguous,
    /// No usable gRPC status (connection trouble, deadline, UNAVAILABLE).
    TransportError,
}

impl Verdict {
    /// Whether this verdict proves the service side of the path exists.
    #[inline]
    #[must_use]
    pub const fn confirms_service(&self) -> bool {
        matches!(self, Verdict::MethodMissing | Verdict::MethodConfirmed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::ServiceMissing => "service-missing",
            Verdict::MethodMissing => "method-missing-service-present",
            Verdict::MethodConfirmed => "method-confirmed",
            Verdict::Ambiguous => "ambiguous",
            Verdict::TransportError => "transport-error",
        };
        f.write_str(s)
    }
}

/// Verdict plus the raw status details, for verbose logs and direct mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub verdict: Verdict,
    /// Status code name as reported by the server (e.g. "Unauthenticated").
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ProbeOutcome {
    #[inline]
    #[must_use]
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            code: None,
            message: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_status<S: Into<String>>(mut self, code: S, message: S) -> Self {
        self.code = Some(code.into());
        self.message = Some(message.into());
        self
    }
}

/// Where a candidate came from. Drives scan-mode reporting and the
/// pattern-expansion early-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateOrigin {
    /// Built-in seed list (health, reflection, common toy services).
    Seed,
    /// Wordlist entry taken verbatim.
    Wordlist,
    /// Variant produced by pattern expansion of a bare name.
    Expanded,
    /// Variant produced by version fuzzing.
    Versioned,
    /// Service name returned by the reflection probe.
    Reflection,
}

/// One `(service, methods)` pair for the orchestrator to probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub service: String,
    pub methods: Vec<String>,
    pub origin: CandidateOrigin,
    /// Variants expanded from the same bare name share a group id; once one
    /// variant confirms, the rest of the group is skipped.
    pub group: Option<u64>,
}

impl Candidate {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(service: S, methods: Vec<String>, origin: CandidateOrigin) -> Self {
        Self {
            service: service.into(),
            methods,
            origin,
            group: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: u64) -> Self {
        self.group = Some(group);
        self
    }
}

/// Result of the transport probe against a single endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointProbe {
    pub connected: bool,
    pub is_grpc: bool,
    /// Human-readable basis for the classification.
    pub reason: String,
    pub latency: Duration,
}

impl EndpointProbe {
    #[must_use]
    pub fn failed<S: Into<String>>(reason: S, latency: Duration) -> Self {
        Self {
            connected: false,
            is_grpc: false,
            reason: reason.into(),
            latency,
        }
    }
}

/// Per-target outcome of the bulk gRPC detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResult {
    pub target: String,
    pub is_grpc: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate scan result for one target.
///
/// Only the orchestrator mutates this, behind a single mutex; everything
/// else receives it read-only after the scan completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub target: String,
    pub scan_mode: ScanMode,
    pub reflection_enabled: bool,
    /// Insertion-ordered, duplicate-free service list.
    pub services: Vec<String>,
    /// Confirmed methods per service. Every key is a member of `services`.
    pub methods_per_service: HashMap<String, Vec<String>>,
    pub health_status: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub errors: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vulnerabilities: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ScanReport {
    #[must_use]
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            target: target.into(),
            scan_mode: ScanMode::Standard,
            reflection_enabled: false,
            services: Vec::new(),
            methods_per_service: HashMap::new(),
            health_status: HashMap::new(),
            errors: HashMap::new(),
            vulnerabilities: Vec::new(),
            timestamp: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Add a service, preserving insertion order. Returns true when the
    /// service was not already present.
    pub fn add_service(&mut self, service: &str) -> bool {
        if self.services.iter().any(|s| s == service) {
            return false;
        }
        self.services.push(service.to_string());
        true
    }

    /// Record a confirmed method. Inserts the service first when needed so
    /// `methods_per_service` keys always appear in `services`.
    pub fn add_method(&mut self, service: &str, method: &str) -> bool {
        self.add_service(service);
        let methods = self
            .methods_per_service
            .entry(service.to_string())
            .or_default();
        if methods.iter().any(|m| m == method) {
            return false;
        }
        methods.push(method.to_string());
        true
    }

    pub fn record_error<K: Into<String>, V: Into<String>>(&mut self, key: K, message: V) {
        self.errors.insert(key.into(), message.into());
    }

    pub fn set_health<K: Into<String>, V: Into<String>>(&mut self, service: K, status: V) {
        self.health_status.insert(service.into(), status.into());
    }

    #[inline]
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    #[inline]
    #[must_use]
    pub fn contains_service(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }
}

/// Scan behaviour tuning. Fields stay `pub` so the orchestrator and probes
/// read them without accessor overhead.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub threads: usize,
    pub call_timeout: Duration,
    pub connect_timeout: Duration,
    /// Overall per-target deadline; None means unbounded.
    pub scan_deadline: Option<Duration>,
    pub tls: bool,
    /// Demote INTERNAL to ambiguous instead of confirming the method.
    pub strict: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threads: 10,
            call_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            scan_deadline: None,
            tls: false,
            strict: false,
        }
    }
}

/// Outcome of the reflection probe.
#[derive(Debug, Clone, Default)]
pub struct ReflectionOutcome {
    /// True iff a non-empty service list was actually received.
    pub enabled: bool,
    pub services: Vec<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_service_preserves_order_and_dedups() {
        let mut report = ScanReport::new("localhost:50051");
        assert!(report.add_service("b.Second"));
        assert!(report.add_service("a.First"));
        assert!(!report.add_service("b.Second"));
        assert_eq!(report.services, vec!["b.Second", "a.First"]);
    }

    #[test]
    fn add_method_keeps_referential_integrity() {
        let mut report = ScanReport::new("localhost:50051");
        assert!(report.add_method("proto.UserService", "Login"));
        assert!(!report.add_method("proto.UserService", "Login"));
        assert!(report.add_method("proto.UserService", "Register"));

        assert!(report.contains_service("proto.UserService"));
        for key in report.methods_per_service.keys() {
            assert!(report.contains_service(key));
        }
        assert_eq!(
            report.methods_per_service["proto.UserService"],
            vec!["Login", "Register"]
        );
    }

    #[test]
    fn scan_mode_serializes_lowercase() {
        let json = serde_json::to_string(&ScanMode::Bruteforce).unwrap();
        assert_eq!(json, "\"bruteforce\"");
        assert_eq!(ScanMode::Reflection.to_string(), "reflection");
    }

    #[test]
    fn verdict_confirms_service() {
        assert!(Verdict::MethodConfirmed.confirms_service());
        assert!(Verdict::MethodMissing.confirms_service());
        assert!(!Verdict::ServiceMissing.confirms_service());
        assert!(!Verdict::Ambiguous.confirms_service());
        assert!(!Verdict::TransportError.confirms_service());
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut report = ScanReport::new("api.example.com:443");
        report.scan_mode = ScanMode::Wordlist;
        report.reflection_enabled = true;
        report.add_method("helloworld.Greeter", "SayHello");
        report.set_health("", "SERVING");

        let json = serde_json::to_string(&report).unwrap();
        let back: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.services, vec!["helloworld.Greeter"]);
        assert_eq!(back.scan_mode, ScanMode::Wordlist);
        assert!(back.reflection_enabled);
        // empty maps follow omitempty semantics
        assert!(!json.contains("\"errors\""));
        assert!(!json.contains("\"vulnerabilities\""));
    }

    #[test]
    fn candidate_grouping() {
        let c = Candidate::new("user.UserService", vec!["Get".into()], CandidateOrigin::Expanded)
            .with_group(7);
        assert_eq!(c.group, Some(7));
    }
}
