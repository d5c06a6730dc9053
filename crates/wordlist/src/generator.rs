//! Candidate generation.
//!
//! Produces the `(service, methods)` stream the orchestrator probes, from
//! four sources in a fixed order: the built-in standard seed, wordlist
//! entries, built-in brute-force words, then version fuzzing across the
//! lot. Deduplication by full service path happens before dispatch and
//! keeps the first occurrence, so the most specific entry wins.

use crate::expand::{expand_patterns, fuzz_versions};
use crate::parser::Wordlist;
use crate::seeds::{
    domain_methods, COMMON_WORDS, DEFAULT_METHODS, HIGH_PRIORITY_METHODS, STANDARD_SERVICES,
};
use grapnel_common::{Candidate, CandidateOrigin};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Upper bound on the candidate queue. Pattern expansion times version
/// fuzzing can grow quadratically on long wordlists; past this point extra
/// candidates are dropped with a warning.
pub const MAX_CANDIDATES: usize = 10_000;

/// Knobs for candidate generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Expand bare names into package/suffix variants.
    pub patterns: bool,
    /// Include the built-in common words (brute-force discovery).
    pub brute: bool,
    pub fuzz_versions: bool,
    pub max_version: u32,
    /// Cap on methods per candidate; 0 means unlimited.
    pub method_limit: usize,
    /// Extra methods appended to every default method list.
    pub extra_methods: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            patterns: true,
            brute: true,
            fuzz_versions: false,
            max_version: 3,
            method_limit: 0,
            extra_methods: Vec::new(),
        }
    }
}

/// Generate the deduplicated candidate stream.
#[must_use]
pub fn generate(wordlist: Option<&Wordlist>, config: &GeneratorConfig) -> Vec<Candidate> {
    let globals: Vec<String> = wordlist
        .map(|w| w.global_methods.clone())
        .unwrap_or_default();

    let mut out: Vec<Candidate> = Vec::new();
    let mut next_group: u64 = 0;

    // 1. Standard services, always probed regardless of mode.
    for (service, methods) in STANDARD_SERVICES {
        let methods = merge_methods(
            methods.iter().map(|m| m.to_string()).collect(),
            &globals,
            config.method_limit,
        );
        out.push(Candidate::new(*service, methods, CandidateOrigin::Seed));
    }

    // 2. Wordlist entries, verbatim first so they win dedup over variants.
    if let Some(wordlist) = wordlist {
        for entry in &wordlist.entries {
            push_name(
                &mut out,
                &entry.service,
                &entry.methods,
                CandidateOrigin::Wordlist,
                &globals,
                config,
                &mut next_group,
            );
        }
    }

    // 3. Built-in brute-force words.
    if config.brute {
        for word in COMMON_WORDS {
            push_name(
                &mut out,
                word,
                &[],
                CandidateOrigin::Seed,
                &globals,
                config,
                &mut next_group,
            );
        }
    }

    // 4. Version fuzzing across everything generated so far.
    if config.fuzz_versions {
        out = apply_version_fuzz(out, config.max_version);
    }

    dedup_candidates(out)
}

#[allow(clippy::too_many_arguments)]
fn push_name(
    out: &mut Vec<Candidate>,
    name: &str,
    explicit_methods: &[String],
    origin: CandidateOrigin,
    globals: &[String],
    config: &GeneratorConfig,
    next_group: &mut u64,
) {
    let base_methods: Vec<String> = if explicit_methods.is_empty() {
        let mut methods: Vec<String> = DEFAULT_METHODS.iter().map(|m| m.to_string()).collect();
        if !name.contains('.') {
            methods.extend(domain_methods(name).iter().map(|m| m.to_string()));
        }
        methods.extend(config.extra_methods.iter().cloned());
        methods
    } else {
        explicit_methods.to_vec()
    };

    let methods = merge_methods(base_methods, globals, config.method_limit);

    if config.patterns && !name.contains('.') {
        let variants = expand_patterns(name);
        if variants.len() > 1 {
            let group = *next_group;
            *next_group += 1;
            for (idx, variant) in variants.into_iter().enumerate() {
                let variant_origin = if idx == 0 { origin } else { CandidateOrigin::Expanded };
                out.push(
                    Candidate::new(variant, methods.clone(), variant_origin).with_group(group),
                );
            }
            return;
        }
    }

    out.push(Candidate::new(name, methods, origin));
}

fn apply_version_fuzz(candidates: Vec<Candidate>, max_version: u32) -> Vec<Candidate> {
    let mut fuzzed = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        for variant in fuzz_versions(&candidate.service, max_version) {
            if variant == candidate.service {
                fuzzed.push(candidate.clone());
            } else {
                // A fuzzed version is a genuinely different service guess,
                // not another spelling of the same bare name; it stays out
                // of the expansion group so an early-stop on a sibling
                // variant never suppresses it.
                fuzzed.push(Candidate::new(
                    variant,
                    candidate.methods.clone(),
                    CandidateOrigin::Versioned,
                ));
            }
        }
    }
    fuzzed
}

fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut out = Vec::with_capacity(candidates.len());
    let total = candidates.len();

    for candidate in candidates {
        if !seen.insert(candidate.service.clone()) {
            continue;
        }
        if out.len() >= MAX_CANDIDATES {
            warn!(
                limit = MAX_CANDIDATES,
                "candidate queue bound reached, dropping the remainder"
            );
            break;
        }
        out.push(candidate);
    }

    debug!(generated = total, unique = out.len(), "candidate stream ready");
    out
}

/// Concatenate and dedup method lists, keeping first occurrence, then apply
/// the per-candidate cap with the high-priority set first.
fn merge_methods(base: Vec<String>, globals: &[String], limit: usize) -> Vec<String> {
    let mut methods: Vec<String> = Vec::with_capacity(base.len() + globals.len());
    for method in base.into_iter().chain(globals.iter().cloned()) {
        if !methods.iter().any(|m| *m == method) {
            methods.push(method);
        }
    }

    if limit == 0 || methods.len() <= limit {
        return methods;
    }

    let mut limited: Vec<String> = Vec::with_capacity(limit);
    for method in methods.iter().filter(|m| HIGH_PRIORITY_METHODS.contains(&m.as_str())) {
        if limited.len() == limit {
            break;
        }
        limited.push(method.clone());
    }
    for method in methods.iter().filter(|m| !HIGH_PRIORITY_METHODS.contains(&m.as_str())) {
        if limited.len() == limit {
            break;
        }
        limited.push(method.clone());
    }
    limited
}
