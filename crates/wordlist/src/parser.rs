//! Wordlist grammar.
//!
//! UTF-8 text, one entry per line. Three entry shapes:
//!
//! ```text
//! pkg.sub.ServiceName                  # service, default methods
//! pkg.UserService:Login,Register      # service with explicit method set
//! *GetById                            # global method, applied everywhere
//! ```
//!
//! Blank lines and lines starting with `#` or `//` are ignored; an inline
//! `#` comment tail is stripped. Lines that fail the FQN shape are skipped
//! with a warning rather than aborting the parse; the fatal case is an
//! unreadable file, not a sloppy line.

use grapnel_common::{GrapnelError, GrapnelResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use tracing::warn;

static SERVICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("static regex")
});

static METHOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// One service line from a wordlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordlistEntry {
    pub service: String,
    /// Explicit methods; empty means "substitute defaults".
    pub methods: Vec<String>,
}

/// Parsed wordlist: service entries plus `*`-prefixed global methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wordlist {
    pub entries: Vec<WordlistEntry>,
    pub global_methods: Vec<String>,
}

impl Wordlist {
    /// Parse wordlist text. Never fails on individual bad lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut global_methods: Vec<String> = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }

            if let Some(method) = line.strip_prefix('*') {
                let method = method.trim();
                if METHOD_RE.is_match(method) {
                    if !global_methods.iter().any(|m| m == method) {
                        global_methods.push(method.to_string());
                    }
                } else {
                    warn!(line = lineno + 1, entry = line, "skipping invalid global method");
                }
                continue;
            }

            let (service, methods_part) = match line.split_once(':') {
                Some((svc, methods)) => (svc.trim(), Some(methods)),
                None => (line, None),
            };

            if !SERVICE_RE.is_match(service) {
                warn!(line = lineno + 1, entry = line, "skipping invalid service path");
                continue;
            }

            let mut methods = Vec::new();
            if let Some(list) = methods_part {
                for method in list.split(',') {
                    let method = method.trim();
                    if method.is_empty() {
                        continue;
                    }
                    if !METHOD_RE.is_match(method) {
                        warn!(line = lineno + 1, method, "skipping invalid method name");
                        continue;
                    }
                    if !methods.iter().any(|m| m == method) {
                        methods.push(method.to_string());
                    }
                }
            }

            entries.push(WordlistEntry {
                service: service.to_string(),
                methods,
            });
        }

        Self {
            entries,
            global_methods,
        }
    }

    /// Load and parse a wordlist file. An unreadable file is fatal: we must
    /// not silently scan less than the user asked for.
    pub fn load<P: AsRef<Path>>(path: P) -> GrapnelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GrapnelError::Wordlist(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Self::parse(&text))
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.global_methods.is_empty()
    }

    /// Whether any service entries were supplied (drives scan-mode
    /// reporting; a wordlist of only global methods still counts).
    #[inline]
    #[must_use]
    pub fn has_entries(&self) -> bool {
        !self.is_empty()
    }
}

impl fmt::Display for Wordlist {
    /// Re-serialize in the same grammar. Round-trips to a semantically
    /// equivalent wordlist (global method order is the one unordered part
    /// of the grammar).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            if entry.methods.is_empty() {
                writeln!(f, "{}", entry.service)?;
            } else {
                writeln!(f, "{}:{}", entry.service, entry.methods.join(","))?;
            }
        }
        for method in &self.global_methods {
            writeln!(f, "*{method}")?;
        }
        Ok(())
    }
}

fn strip_comment(raw: &str) -> &str {
    let line = raw.trim();
    if line.starts_with('#') || line.starts_with("//") {
        return "";
    }
    match line.find('#') {
        Some(idx) if idx > 0 => line[..idx].trim_end(),
        _ => line,
    }
}

/// Parse an extra-methods file: one method name per line, same comment
/// rules as the wordlist.
pub fn load_methods_file<P: AsRef<Path>>(path: P) -> GrapnelResult<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| GrapnelError::Wordlist(format!("cannot read {}: {e}", path.display())))?;
    Ok(parse_methods(&text))
}

#[must_use]
pub fn parse_methods(text: &str) -> Vec<String> {
    let mut methods = Vec::new();
    for raw in text.lines() {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }
        if !METHOD_RE.is_match(line) {
            warn!(entry = line, "skipping invalid method name");
            continue;
        }
        if !methods.iter().any(|m| m == line) {
            methods.push(line.to_string());
        }
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_shapes() {
        let text = "\
# comment line
// another comment

proto.UserService:Login,Register,GetProfile
helloworld.Greeter
*GetById
";
        let wl = Wordlist::parse(text);
        assert_eq!(wl.entries.len(), 2);
        assert_eq!(wl.entries[0].service, "proto.UserService");
        assert_eq!(wl.entries[0].methods, vec!["Login", "Register", "GetProfile"]);
        assert_eq!(wl.entries[1].service, "helloworld.Greeter");
        assert!(wl.entries[1].methods.is_empty());
        assert_eq!(wl.global_methods, vec!["GetById"]);
    }

    #[test]
    fn strips_inline_comments() {
        let wl = Wordlist::parse("user.UserService # the main one\n");
        assert_eq!(wl.entries[0].service, "user.UserService");
    }

    #[test]
    fn skips_invalid_lines() {
        let text = "good.Service\n1bad.Service\nbad service\nok.Service:Get,9bad\n";
        let wl = Wordlist::parse(text);
        assert_eq!(wl.entries.len(), 2);
        assert_eq!(wl.entries[0].service, "good.Service");
        // the invalid method inside an otherwise-valid entry is dropped
        assert_eq!(wl.entries[1].methods, vec!["Get"]);
    }

    #[test]
    fn dedups_methods_within_entry() {
        let wl = Wordlist::parse("svc.A:Get,Get,List\n");
        assert_eq!(wl.entries[0].methods, vec!["Get", "List"]);
    }

    #[test]
    fn round_trip_is_semantically_equivalent() {
        let text = "proto.UserService:Login,Register\nhelloworld.Greeter\n*GetById\n*Watch\n";
        let first = Wordlist::parse(text);
        let second = Wordlist::parse(&first.to_string());
        assert_eq!(first.entries, second.entries);

        let mut a = first.global_methods.clone();
        let mut b = second.global_methods.clone();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_is_empty() {
        let wl = Wordlist::parse("\n# nothing here\n");
        assert!(wl.is_empty());
        assert!(!wl.has_entries());
    }

    #[test]
    fn methods_file_parsing() {
        let methods = parse_methods("# common\nGet\nList\nGet\nbad method\n");
        assert_eq!(methods, vec!["Get", "List"]);
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(Wordlist::load("/definitely/not/here.txt").is_err());
    }
}
