//! Wildcard and vendor-token matching used by every interpreter.
//!
//! Artifact-id patterns are structural: `*-api` is a suffix test, `acme-*`
//! a prefix test, `*jdbc*` a substring test and anything else an exact
//! comparison. Vendor detection is different: it looks for a token with a
//! word boundary on both sides so that `java` is found in `JavaConfig` but
//! not in `javascript`.

use crate::layer::Layer;

/// Matches `candidate` against a single wildcard pattern.
pub fn matches(candidate: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let leading = pattern.starts_with('*');
    let trailing = pattern.ends_with('*');

    match (leading, trailing) {
        (true, true) => candidate.contains(&pattern[1..pattern.len() - 1]),
        (true, false) => candidate.ends_with(&pattern[1..]),
        (false, true) => candidate.starts_with(&pattern[..pattern.len() - 1]),
        (false, false) => candidate == pattern,
    }
}

/// Returns true when `candidate` matches at least one of `patterns`.
pub fn matches_any<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| matches(candidate, p.as_ref()))
}

/// Case-insensitive token search requiring a word boundary on both sides.
pub fn contains_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() || token.len() > haystack.len() {
        return false;
    }

    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_token = token.to_ascii_lowercase();
    let bytes = haystack.as_bytes();

    lower_haystack
        .match_indices(&lower_token)
        .any(|(start, matched)| {
            let end = start + matched.len();
            leading_boundary(bytes, start) && trailing_boundary(bytes, end)
        })
}

fn leading_boundary(bytes: &[u8], start: usize) -> bool {
    if start == 0 {
        return true;
    }
    let prev = bytes[start - 1];
    if !prev.is_ascii_alphanumeric() {
        return true;
    }
    // camel-case hump: `myJava`
    bytes[start].is_ascii_uppercase() && !prev.is_ascii_uppercase()
}

fn trailing_boundary(bytes: &[u8], end: usize) -> bool {
    if end >= bytes.len() {
        return true;
    }
    let next = bytes[end];
    if !next.is_ascii_alphanumeric() {
        return true;
    }
    // camel-case hump: `JavaConfig`, `AWSClient`
    next.is_ascii_uppercase()
}

/// Values substituted into rule patterns before comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderContext {
    pub base: String,
    pub namespace: String,
    pub module: String,
}

impl PlaceholderContext {
    pub fn substitute(&self, pattern: &str) -> String {
        pattern
            .replace("{base}", &self.base)
            .replace("{namespace}", &self.namespace)
            .replace("{groupId}", &self.namespace)
            .replace("{module}", &self.module)
    }

    pub fn substitute_all(&self, patterns: &[String]) -> Vec<String> {
        patterns.iter().map(|p| self.substitute(p)).collect()
    }
}

/// Strips the layer suffix (or a parent/aggregator suffix) from an artifact id.
pub fn base_name<S: AsRef<str>>(artifact_id: &str, grouping_suffixes: &[S]) -> String {
    if let Some(layer) = Layer::from_artifact_id(artifact_id) {
        return artifact_id[..artifact_id.len() - layer.suffix().len()].to_string();
    }

    for suffix in grouping_suffixes {
        let suffix = suffix.as_ref();
        if !suffix.is_empty() && artifact_id.ends_with(suffix) && artifact_id.len() > suffix.len() {
            return artifact_id[..artifact_id.len() - suffix.len()].to_string();
        }
    }

    artifact_id.to_string()
}

/// Renders at most three entries, followed by an ellipsis when there are more.
pub fn cap_list<S: AsRef<str>>(items: &[S]) -> String {
    let shown: Vec<&str> = items.iter().take(3).map(|s| s.as_ref()).collect();
    let mut text = shown.join(", ");
    if items.len() > 3 {
        text.push_str(", ...");
    }
    text
}
