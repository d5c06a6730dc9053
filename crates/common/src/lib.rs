//! Grapnel Common - shared types and traits.
//!
//! This crate provides the core types, probe traits, and error handling
//! used across the Grapnel discovery engine.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{GrapnelError, GrapnelResult};
pub use traits::{HealthProber, MethodProber, ReflectionProber};
pub use types::{
    Candidate, CandidateOrigin, DetectResult, EndpointProbe, ProbeOutcome, ReflectionOutcome,
    ScanMode, ScanOptions, ScanReport, Verdict,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
