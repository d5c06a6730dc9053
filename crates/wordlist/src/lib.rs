//! Grapnel Wordlist - candidate generation for service discovery.
//!
//! Turns wordlists, built-in seeds and expansion rules into the stream of
//! `(service, methods)` candidates the orchestrator probes.

pub mod expand;
pub mod generator;
pub mod parser;
pub mod seeds;

pub use expand::{expand_patterns, fuzz_versions};
pub use generator::{generate, GeneratorConfig, MAX_CANDIDATES};
pub use parser::{load_methods_file, parse_methods, Wordlist, WordlistEntry};
pub use seeds::{DEFAULT_METHODS, STANDARD_SERVICES};
