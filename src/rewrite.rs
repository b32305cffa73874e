//! Path substitution primitives
//!
//! Every path reference in a cloned environment is fixed up through the two
//! functions in this module: [`rewrite`] for raw file contents and
//! [`rewrite_structured`] for decoded serialized configuration. Both apply
//! the same [`SubstitutionRule`] as a literal, case-sensitive, left-to-right,
//! non-overlapping substring replacement. There are no pattern semantics; the
//! old path is matched byte for byte.

use std::path::Path;

use crate::error::{Error, Result};
use crate::serialized::Value;

/// Replace every occurrence of `from` with `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    from: String,
    to: String,
}

impl SubstitutionRule {
    /// Build a rule from plain strings.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Build a rule mapping one environment root onto another.
    ///
    /// Paths are embedded in text files, so both must be valid UTF-8.
    pub fn for_roots(from: &Path, to: &Path) -> Result<Self> {
        let as_str = |path: &Path| {
            path.to_str().map(str::to_string).ok_or_else(|| Error::Clone {
                message: format!("path is not valid UTF-8: {}", path.display()),
            })
        };
        Ok(Self::new(as_str(from)?, as_str(to)?))
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// True when applying the rule cannot change anything.
    pub fn is_identity(&self) -> bool {
        self.from.is_empty() || self.from == self.to
    }
}

/// Rewrite `content`, replacing every occurrence of `rule.from` with
/// `rule.to`.
pub fn rewrite(content: &[u8], rule: &SubstitutionRule) -> Vec<u8> {
    let from = rule.from.as_bytes();
    if from.is_empty() {
        return content.to_vec();
    }
    let to = rule.to.as_bytes();

    let mut out = Vec::with_capacity(content.len());
    let mut rest = content;
    while let Some(pos) = find(rest, from) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(to);
        rest = &rest[pos + from.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// [`rewrite`] for text.
pub fn rewrite_str(content: &str, rule: &SubstitutionRule) -> String {
    if rule.from.is_empty() {
        return content.to_string();
    }
    content.replace(rule.from(), rule.to())
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(pos) = find(rest, needle) {
        count += 1;
        rest = &rest[pos + needle.len()..];
    }
    count
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Rewrite every string leaf of a structured value.
///
/// Sequences and mappings are rebuilt element by element in their original
/// order. Mapping keys are never rewritten. Non-string scalars pass through.
pub fn rewrite_structured(value: Value, rule: &SubstitutionRule) -> Value {
    match value {
        Value::String(bytes) => Value::String(rewrite(&bytes, rule)),
        Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(|item| rewrite_structured(item, rule))
                .collect(),
        ),
        Value::Mapping(entries) => Value::Mapping(
            entries
                .into_iter()
                .map(|(key, item)| (key, rewrite_structured(item, rule)))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Count occurrences of `needle` across the string leaves of `value`.
pub fn structured_occurrences(value: &Value, needle: &[u8]) -> usize {
    match value {
        Value::String(bytes) => occurrences(bytes, needle),
        Value::Sequence(items) => items
            .iter()
            .map(|item| structured_occurrences(item, needle))
            .sum(),
        Value::Mapping(entries) => entries
            .iter()
            .map(|(_, item)| structured_occurrences(item, needle))
            .sum(),
        _ => 0,
    }
}
