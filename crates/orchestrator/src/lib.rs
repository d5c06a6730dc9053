//! Grapnel Orchestrator - scan coordination and bulk detection.
//!
//! Composes the transport, oracle, reflection and wordlist crates into the
//! two top-level operations: the per-target discovery scan and the
//! multi-target gRPC detector.

pub mod detector;
pub mod progress;
pub mod scanner;
pub mod vulns;

pub use detector::{detect_targets, normalize_target, DetectorConfig, DEFAULT_DETECT_PORT};
pub use progress::ProgressTracker;
pub use scanner::{scan_endpoint, ScanContext, ScanEngine};
