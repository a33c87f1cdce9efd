//! Canonical log group identifiers.
//!
//! Data sources disagree on identifier form: the listing and anomaly-detector
//! APIs return fully-qualified ARNs, while subscription filters and export
//! events use bare names. Every comparison in the pipeline happens on
//! [`LogGroupId`], which can only be built through [`normalize`] or
//! [`canonicalize`].

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Delimiter separating the resource type segment from the name segment.
const LOG_GROUP_DELIMITER: &str = ":log-group:";

/// Wildcard suffix carried by the `arn` attribute of listed log groups.
const WILDCARD_SUFFIX: &str = ":*";

const ARN_PREFIX: &str = "arn:";

/// Short, name-only identifier of a log group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LogGroupId(String);

impl LogGroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LogGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogGroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the name segment of a fully-qualified identifier.
///
/// Returns `None` when the `:log-group:` delimiter is absent or the name
/// segment is empty. Callers drop such entries silently.
pub fn normalize(raw: &str) -> Option<LogGroupId> {
    let (_, name) = raw.trim().split_once(LOG_GROUP_DELIMITER)?;
    let name = name.strip_suffix(WILDCARD_SUFFIX).unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(LogGroupId(name.to_string()))
}

/// Accept either a fully-qualified identifier or an already-short name.
///
/// Idempotent: `canonicalize(id.as_str()) == Some(id)` for every id.
pub fn canonicalize(raw: &str) -> Option<LogGroupId> {
    let raw = raw.trim();
    if raw.contains(LOG_GROUP_DELIMITER) {
        return normalize(raw);
    }
    if raw.is_empty() || raw.starts_with(ARN_PREFIX) || raw.contains(':') {
        return None;
    }
    Some(LogGroupId(raw.to_string()))
}

/// Identifiers disqualified by one stage's signal.
pub type ExclusionSet = HashSet<LogGroupId>;

/// Working set of identifiers still under consideration.
///
/// Duplicate-free; keeps first-insertion order so stage outputs are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateSet {
    order: Vec<LogGroupId>,
    #[serde(skip)]
    members: HashSet<LogGroupId>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: LogGroupId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: &LogGroupId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogGroupId> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[LogGroupId] {
        &self.order
    }

    pub fn chunks(&self, size: usize) -> std::slice::Chunks<'_, LogGroupId> {
        self.order.chunks(size)
    }

    /// Every member not present in `excluded`, in the current order.
    pub fn without(&self, excluded: &ExclusionSet) -> Self {
        self.iter()
            .filter(|id| !excluded.contains(*id))
            .cloned()
            .collect()
    }

    pub fn is_subset_of(&self, other: &CandidateSet) -> bool {
        self.iter().all(|id| other.contains(id))
    }

    pub fn into_vec(self) -> Vec<LogGroupId> {
        self.order
    }
}

impl FromIterator<LogGroupId> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = LogGroupId>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<LogGroupId> for CandidateSet {
    fn extend<I: IntoIterator<Item = LogGroupId>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a LogGroupId;
    type IntoIter = std::slice::Iter<'a, LogGroupId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for CandidateSet {
    type Item = LogGroupId;
    type IntoIter = std::vec::IntoIter<LogGroupId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(name: &str) -> LogGroupId {
        canonicalize(name).expect("valid name")
    }

    #[test]
    fn normalize_extracts_name_segment() {
        let cases = [
            (
                "arn:aws:logs:us-west-2:123456789012:log-group:my-log-group",
                Some("my-log-group"),
            ),
            (
                "arn:aws:logs:us-east-1:123456789012:log-group:/aws/lambda/handler:*",
                Some("/aws/lambda/handler"),
            ),
            ("invalid-arn", None),
            ("arn:aws:logs:us-west-2:123456789012:not-a-log-group", None),
            ("arn:aws:logs:us-west-2:123456789012:log-group:", None),
            ("", None),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                normalize(raw).as_ref().map(LogGroupId::as_str),
                expected,
                "input: {raw:?}"
            );
        }
    }

    #[test]
    fn canonicalize_is_idempotent_on_short_names() {
        let short = id("/aws/lambda/handler");
        assert_eq!(canonicalize(short.as_str()), Some(short.clone()));

        let from_arn =
            canonicalize("arn:aws:logs:eu-west-1:123456789012:log-group:/aws/lambda/handler")
                .expect("arn");
        assert_eq!(from_arn, short);
        assert_eq!(canonicalize(from_arn.as_str()), Some(from_arn));
    }

    #[test]
    fn canonicalize_rejects_arns_without_delimiter() {
        assert_eq!(canonicalize("arn:aws:logs:us-west-2:1:not-a-log-group"), None);
        assert_eq!(canonicalize("   "), None);
    }

    #[test]
    fn candidate_set_dedupes_and_keeps_order() {
        let set: CandidateSet = ["b", "a", "b", "c"].into_iter().map(id).collect();
        let names: Vec<_> = set.iter().map(LogGroupId::as_str).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn without_removes_excluded_members_only() {
        let set: CandidateSet = ["a", "b", "c"].into_iter().map(id).collect();
        let excluded: ExclusionSet = [id("b"), id("zzz")].into_iter().collect();

        let filtered = set.without(&excluded);
        let names: Vec<_> = filtered.iter().map(LogGroupId::as_str).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(filtered.is_subset_of(&set));
    }

    #[test]
    fn serializes_as_plain_list() {
        let set: CandidateSet = ["a", "b"].into_iter().map(id).collect();
        let json = serde_json::to_string(&set).expect("serialize");
        assert_eq!(json, r#"["a","b"]"#);
    }
}
