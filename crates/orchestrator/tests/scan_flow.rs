//! End-to-end scan flow against mock probers.
//!
//! The engine only ever sees the probe traits, so a fake backend stands in
//! for a live server: it answers service-missing for unknown services,
//! method-missing for unknown methods on known services, and a configurable
//! confirming verdict for known methods.

use async_trait::async_trait;
use grapnel_common::{
    GrapnelError, GrapnelResult, HealthProber, MethodProber, ProbeOutcome, ReflectionOutcome,
    ReflectionProber, ScanMode, ScanOptions, ScanReport, Verdict,
};
use grapnel_orchestrator::{ScanContext, ScanEngine};
use grapnel_wordlist::{generate, GeneratorConfig, Wordlist};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct FakeBackend {
    /// service name -> (known methods, verdict for a known-method hit)
    services: HashMap<String, (Vec<String>, Verdict)>,
}

impl FakeBackend {
    fn new(services: &[(&str, &[&str], Verdict)]) -> Arc<Self> {
        let services = services
            .iter()
            .map(|(name, methods, verdict)| {
                (
                    name.to_string(),
                    (
                        methods.iter().map(|m| m.to_string()).collect(),
                        *verdict,
                    ),
                )
            })
            .collect();
        Arc::new(Self { services })
    }
}

#[async_trait]
impl MethodProber for FakeBackend {
    async fn probe(&self, service: &str, method: &str) -> ProbeOutcome {
        match self.services.get(service) {
            None => ProbeOutcome::new(Verdict::ServiceMissing)
                .with_status("Unimplemented", "unknown service"),
            Some((methods, verdict)) => {
                if methods.iter().any(|m| m == method) {
                    ProbeOutcome::new(*verdict)
                } else {
                    ProbeOutcome::new(Verdict::MethodMissing)
                        .with_status("Unimplemented", "unknown method")
                }
            }
        }
    }
}

struct FakeReflection {
    outcome: ReflectionOutcome,
}

impl FakeReflection {
    fn disabled() -> Arc<Self> {
        Arc::new(Self {
            outcome: ReflectionOutcome {
                enabled: false,
                services: Vec::new(),
                error: Some("unknown service grpc.reflection.v1alpha.ServerReflection".into()),
            },
        })
    }

    fn listing(services: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outcome: ReflectionOutcome {
                enabled: true,
                services: services.iter().map(|s| s.to_string()).collect(),
                error: None,
            },
        })
    }
}

#[async_trait]
impl ReflectionProber for FakeReflection {
    async fn list_services(&self) -> ReflectionOutcome {
        self.outcome.clone()
    }
}

struct FakeHealth;

#[async_trait]
impl HealthProber for FakeHealth {
    async fn check(&self, _service: Option<&str>) -> GrapnelResult<String> {
        Ok("SERVING".to_string())
    }
}

struct NoHealth;

#[async_trait]
impl HealthProber for NoHealth {
    async fn check(&self, _service: Option<&str>) -> GrapnelResult<String> {
        Err(GrapnelError::Health("unknown service".into()))
    }
}

fn options() -> ScanOptions {
    ScanOptions {
        threads: 4,
        ..Default::default()
    }
}

fn assert_invariants(report: &ScanReport) {
    // no duplicate services
    let mut seen = std::collections::HashSet::new();
    for service in &report.services {
        assert!(seen.insert(service.clone()), "duplicate service {service}");
    }
    // referential integrity and no duplicate methods
    for (service, methods) in &report.methods_per_service {
        assert!(
            report.services.contains(service),
            "method key {service} missing from services"
        );
        let mut seen = std::collections::HashSet::new();
        for method in methods {
            assert!(seen.insert(method.clone()), "duplicate method {method}");
        }
    }
}

/// Scenario 1: greeter + health hosted, reflection disabled, no wordlist.
#[tokio::test]
async fn bruteforce_discovers_hosted_services() {
    let backend = FakeBackend::new(&[
        (
            "helloworld.Greeter",
            &["SayHello"],
            Verdict::MethodConfirmed,
        ),
        ("grpc.health.v1.Health", &["Check"], Verdict::MethodConfirmed),
    ]);
    let engine = ScanEngine::new(backend, options())
        .with_reflection(FakeReflection::disabled())
        .with_health(Arc::new(FakeHealth));

    let candidates = generate(None, &GeneratorConfig::default());
    let ctx = ScanContext {
        wordlist_supplied: false,
        brute_enabled: true,
        mode_override: None,
    };
    let report = engine.scan("localhost:50051", candidates, &ctx).await;

    assert_invariants(&report);
    assert!(!report.reflection_enabled);
    assert_eq!(report.scan_mode, ScanMode::Bruteforce);

    let mut services = report.services.clone();
    services.sort();
    assert_eq!(services, vec!["grpc.health.v1.Health", "helloworld.Greeter"]);
    assert!(report.methods_per_service["helloworld.Greeter"].contains(&"SayHello".to_string()));
    assert!(report.methods_per_service["grpc.health.v1.Health"].contains(&"Check".to_string()));
    assert_eq!(report.health_status[""], "SERVING");
}

/// Scenario 2: same target with reflection enabled.
#[tokio::test]
async fn reflection_listing_sets_mode_and_flag() {
    let backend = FakeBackend::new(&[
        (
            "helloworld.Greeter",
            &["SayHello"],
            Verdict::MethodConfirmed,
        ),
        ("grpc.health.v1.Health", &["Check"], Verdict::MethodConfirmed),
    ]);
    let engine = ScanEngine::new(backend, options())
        .with_reflection(FakeReflection::listing(&[
            "helloworld.Greeter",
            "grpc.health.v1.Health",
        ]))
        .with_health(Arc::new(FakeHealth));

    let candidates = generate(None, &GeneratorConfig::default());
    let ctx = ScanContext {
        wordlist_supplied: false,
        brute_enabled: true,
        mode_override: None,
    };
    let report = engine.scan("localhost:50051", candidates, &ctx).await;

    assert_invariants(&report);
    assert!(report.reflection_enabled);
    assert_eq!(report.scan_mode, ScanMode::Reflection);

    let mut services = report.services.clone();
    services.sort();
    assert_eq!(services, vec!["grpc.health.v1.Health", "helloworld.Greeter"]);
    // reflection exposure is observed as a finding
    assert!(report
        .vulnerabilities
        .iter()
        .any(|v| v.contains("reflection")));
}

/// Scenario 3: wordlist entry expands to the real package-qualified name.
#[tokio::test]
async fn pattern_expansion_reaches_prefixed_service() {
    let backend = FakeBackend::new(&[(
        "proto.UserService",
        &["Login", "Register", "GetProfile"],
        Verdict::MethodConfirmed,
    )]);
    let engine = ScanEngine::new(backend, options())
        .with_reflection(FakeReflection::disabled())
        .with_health(Arc::new(NoHealth));

    let wordlist = Wordlist::parse("UserService:Login,Register,GetProfile\n");
    let candidates = generate(Some(&wordlist), &GeneratorConfig::default());
    let ctx = ScanContext {
        wordlist_supplied: true,
        brute_enabled: true,
        mode_override: None,
    };
    let report = engine.scan("localhost:50051", candidates, &ctx).await;

    assert_invariants(&report);
    assert_eq!(report.scan_mode, ScanMode::Wordlist);
    assert!(report.contains_service("proto.UserService"));

    let mut methods = report.methods_per_service["proto.UserService"].clone();
    methods.sort();
    assert_eq!(methods, vec!["GetProfile", "Login", "Register"]);
    assert!(!methods.contains(&"Logout".to_string()));
}

/// Scenario 4: a global method is confirmed on every service that has it.
#[tokio::test]
async fn global_method_confirms_on_multiple_services() {
    let backend = FakeBackend::new(&[
        ("proto.UserService", &["GetById"], Verdict::MethodConfirmed),
        (
            "proto.ProductService",
            &["GetById"],
            Verdict::MethodConfirmed,
        ),
    ]);
    let engine = ScanEngine::new(backend, options())
        .with_reflection(FakeReflection::disabled())
        .with_health(Arc::new(NoHealth));

    let wordlist = Wordlist::parse("*GetById\n");
    let candidates = generate(Some(&wordlist), &GeneratorConfig::default());
    let ctx = ScanContext {
        wordlist_supplied: true,
        brute_enabled: true,
        mode_override: None,
    };
    let report = engine.scan("localhost:50051", candidates, &ctx).await;

    assert_invariants(&report);
    for service in ["proto.UserService", "proto.ProductService"] {
        assert!(report.contains_service(service), "{service} missing");
        assert!(
            report.methods_per_service[service].contains(&"GetById".to_string()),
            "{service} lacks GetById"
        );
    }
}

/// Scenario 6: direct probe of an auth-gated method.
#[tokio::test]
async fn direct_probe_confirms_auth_gated_method() {
    let backend = FakeBackend::new(&[(
        "UserService",
        &["GetUser"],
        Verdict::MethodConfirmed, // UNAUTHENTICATED classifies as confirmed
    )]);
    let engine = ScanEngine::new(backend, options());

    let candidates = vec![grapnel_common::Candidate::new(
        "UserService",
        vec!["GetUser".to_string()],
        grapnel_common::CandidateOrigin::Wordlist,
    )];
    let ctx = ScanContext {
        wordlist_supplied: false,
        brute_enabled: false,
        mode_override: Some(ScanMode::Direct),
    };
    let report = engine.scan("localhost:50051", candidates, &ctx).await;

    assert_eq!(report.scan_mode, ScanMode::Direct);
    assert!(report.contains_service("UserService"));
    assert!(report.methods_per_service["UserService"].contains(&"GetUser".to_string()));
}

/// Boundary: a server that knows no services at all yields an empty report.
#[tokio::test]
async fn unknown_service_everywhere_yields_empty_report() {
    let backend = FakeBackend::new(&[]);
    let engine = ScanEngine::new(backend, options())
        .with_reflection(FakeReflection::disabled())
        .with_health(Arc::new(NoHealth));

    let wordlist = Wordlist::parse("UserService:Login\n");
    let candidates = generate(Some(&wordlist), &GeneratorConfig::default());
    let ctx = ScanContext {
        wordlist_supplied: true,
        brute_enabled: true,
        mode_override: None,
    };
    let report = engine.scan("localhost:50051", candidates, &ctx).await;

    assert!(report.services.is_empty());
    assert!(!report.reflection_enabled);
    assert_eq!(report.scan_mode, ScanMode::Wordlist);
    assert!(report.errors.contains_key("health_check"));
}

/// Ambiguous and transport verdicts never create services.
#[tokio::test]
async fn inconclusive_verdicts_are_discarded() {
    struct Inconclusive;

    #[async_trait]
    impl MethodProber for Inconclusive {
        async fn probe(&self, service: &str, _method: &str) -> ProbeOutcome {
            if service.contains("Ambig") {
                ProbeOutcome::new(Verdict::Ambiguous)
            } else {
                ProbeOutcome::new(Verdict::TransportError)
            }
        }
    }

    let engine = ScanEngine::new(Arc::new(Inconclusive), options());
    let candidates = vec![
        grapnel_common::Candidate::new(
            "svc.AmbigService",
            vec!["Get".to_string()],
            grapnel_common::CandidateOrigin::Wordlist,
        ),
        grapnel_common::Candidate::new(
            "svc.FlakyService",
            vec!["Get".to_string()],
            grapnel_common::CandidateOrigin::Wordlist,
        ),
    ];
    let ctx = ScanContext::default();
    let report = engine.scan("localhost:50051", candidates, &ctx).await;
    assert!(report.services.is_empty());
}

/// A pre-set cancel flag stops dispatch and marks the report partial.
#[tokio::test]
async fn cancelled_scan_emits_partial_results() {
    let backend = FakeBackend::new(&[(
        "helloworld.Greeter",
        &["SayHello"],
        Verdict::MethodConfirmed,
    )]);
    let cancel = Arc::new(AtomicBool::new(false));
    cancel.store(true, Ordering::Relaxed);

    let engine = ScanEngine::new(backend, options()).with_cancel(cancel);
    let candidates = generate(None, &GeneratorConfig::default());
    let report = engine
        .scan("localhost:50051", candidates, &ScanContext::default())
        .await;

    assert!(report.services.is_empty());
    assert!(report.errors.contains_key("cancelled"));
}
