//! Probe traits: the seams between the orchestrator and the wire.
//!
//! The orchestrator is written against these traits only, so the whole scan
//! flow is testable without a live server.

use crate::error::GrapnelResult;
use crate::types::{ProbeOutcome, ReflectionOutcome};
use async_trait::async_trait;

/// Decides whether a fully-qualified `service/method` path exists by issuing
/// one zero-body unary invocation and classifying the response.
///
/// Implementations must be idempotent and side-effect free beyond the single
/// RPC.
#[async_trait]
pub trait MethodProber: Send + Sync {
    async fn probe(&self, service: &str, method: &str) -> ProbeOutcome;
}

/// Attempts to enumerate service names via server reflection.
///
/// `enabled` in the outcome must be true only when a non-empty service list
/// was actually received; a stream that opens but yields nothing is not
/// "enabled".
#[async_trait]
pub trait ReflectionProber: Send + Sync {
    async fn list_services(&self) -> ReflectionOutcome;
}

/// Standard health-checking client. `service: None` asks for the overall
/// serving status.
#[async_trait]
pub trait HealthProber: Send + Sync {
    async fn check(&self, service: Option<&str>) -> GrapnelResult<String>;
}
