//! Pattern expansion and version fuzzing.
//!
//! Servers rarely expose a bare `User` service; the real name is usually
//! something like `user.UserService` or `proto.UserService`. Expansion
//! turns a bare name into the package/suffix shapes observed in the wild so
//! a single wordlist word covers them all. Variants of one bare name form a
//! group: once any variant confirms, probing the rest only produces
//! duplicates or false positives.

use once_cell::sync::Lazy;
use regex::Regex;

/// Package prefixes commonly wrapped around `FooService` names.
const PACKAGE_PREFIXES: &[&str] = &["api", "proto", "pb", "rpc", "grpc"];

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.v(\d+)\.").expect("static regex"));

/// Capitalize the first ASCII letter, leaving the rest alone.
#[must_use]
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Expand a bare name (no `.`) into its likely fully-qualified shapes.
///
/// The bare name itself always comes first so the most literal variant is
/// probed before the speculative ones. Dotted names are returned unchanged:
/// they are already fully qualified.
#[must_use]
pub fn expand_patterns(name: &str) -> Vec<String> {
    if name.contains('.') || name.is_empty() {
        return vec![name.to_string()];
    }

    let cap = capitalize(name);
    let base = cap.strip_suffix("Service").unwrap_or(&cap).to_string();
    let service_form = if cap.ends_with("Service") {
        cap.clone()
    } else {
        format!("{base}Service")
    };
    let lower = base.to_lowercase();

    let mut variants = vec![name.to_string()];
    let mut push = |v: String| {
        if !variants.iter().any(|existing| existing == &v) {
            variants.push(v);
        }
    };

    if !name.ends_with("Service") {
        push(service_form.clone());
    }
    push(format!("{lower}.{service_form}"));
    push(format!("api.{cap}"));
    push(format!("{lower}.v1.{service_form}"));
    for prefix in PACKAGE_PREFIXES {
        push(format!("{prefix}.{service_form}"));
    }

    variants
}

/// Expand `.vN.` version segments into every version in `[1, max_version]`.
///
/// The original path is always retained (and returned first). Paths without
/// a version segment come back unchanged, so applying the fuzz twice yields
/// the same set as applying it once.
#[must_use]
pub fn fuzz_versions(path: &str, max_version: u32) -> Vec<String> {
    let caps = match VERSION_RE.captures(path) {
        Some(caps) => caps,
        None => return vec![path.to_string()],
    };

    let found: u32 = match caps[1].parse() {
        Ok(n) => n,
        Err(_) => return vec![path.to_string()],
    };
    if found == 0 || found > max_version {
        return vec![path.to_string()];
    }

    let segment = &caps[0];
    let mut variants = vec![path.to_string()];
    for version in 1..=max_version {
        if version == found {
            continue;
        }
        let replaced = path.replacen(segment, &format!(".v{version}."), 1);
        if !variants.iter().any(|v| v == &replaced) {
            variants.push(replaced);
        }
    }
    variants
}
