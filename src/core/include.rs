//! Include/exclude specification parsing
//!
//! Includes and excludes use a comma-delimited grammar of dotted relationship
//! paths: `author,comments.author`. Requesting `comments.author` implies
//! `comments`. Anything after a `:` in an entry is a modifier and is ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default maximum include depth
pub const DEFAULT_RECURSION_LIMIT: usize = 10;

/// A list of include paths, as written in configuration
///
/// Accepts either a comma-delimited string or a sequence of paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncludeList {
    Csv(String),
    List(Vec<String>),
}

impl IncludeList {
    /// Split into trimmed, non-empty entries
    pub fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            IncludeList::Csv(csv) => csv.split(',').collect(),
            IncludeList::List(list) => list.iter().flat_map(|s| s.split(',')).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<&str> for IncludeList {
    fn from(value: &str) -> Self {
        IncludeList::Csv(value.to_string())
    }
}

impl From<Vec<&str>> for IncludeList {
    fn from(value: Vec<&str>) -> Self {
        IncludeList::List(value.into_iter().map(str::to_string).collect())
    }
}

/// The parsed include and exclude sets of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeSpec {
    included: BTreeSet<String>,
    excluded: BTreeSet<String>,
    recursion_limit: usize,
}

impl Default for IncludeSpec {
    fn default() -> Self {
        Self {
            included: BTreeSet::new(),
            excluded: BTreeSet::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl IncludeSpec {
    /// Parse include and exclude lists with the default recursion limit
    pub fn parse(includes: Option<&IncludeList>, excludes: Option<&IncludeList>) -> Self {
        Self::parse_with_limit(includes, excludes, DEFAULT_RECURSION_LIMIT)
    }

    /// Parse include and exclude lists
    ///
    /// Include paths deeper than `recursion_limit` are truncated.
    pub fn parse_with_limit(
        includes: Option<&IncludeList>,
        excludes: Option<&IncludeList>,
        recursion_limit: usize,
    ) -> Self {
        let mut included = BTreeSet::new();
        for entry in includes.map(IncludeList::entries).unwrap_or_default() {
            let segments: Vec<&str> = strip_modifiers(&entry)
                .split('.')
                .map(str::trim)
                .take(recursion_limit)
                .collect();
            if segments.iter().any(|s| s.is_empty()) {
                continue;
            }
            // every parent of a nested path is implied
            for depth in 1..=segments.len() {
                included.insert(segments[..depth].join("."));
            }
        }

        let excluded = excludes
            .map(IncludeList::entries)
            .unwrap_or_default()
            .into_iter()
            .map(|e| strip_modifiers(&e).to_string())
            .filter(|e| !e.is_empty())
            .collect();

        Self {
            included,
            excluded,
            recursion_limit,
        }
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn included(&self) -> impl Iterator<Item = &str> {
        self.included.iter().map(String::as_str)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    /// Names requested directly under `scope` (`""` is the root)
    pub fn requested_at(&self, scope: &str) -> Vec<String> {
        self.included
            .iter()
            .filter_map(|path| {
                let rest = if scope.is_empty() {
                    path.as_str()
                } else {
                    path.strip_prefix(scope)?.strip_prefix('.')?
                };
                (!rest.contains('.')).then(|| rest.to_string())
            })
            .collect()
    }

    /// Whether `path` or one of its ancestors is excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.iter().any(|excluded| {
            path == excluded
                || path
                    .strip_prefix(excluded.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Full dotted path of `name` under `scope`
    pub fn path(scope: &str, name: &str) -> String {
        if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope, name)
        }
    }
}

fn strip_modifiers(entry: &str) -> &str {
    entry.split(':').next().unwrap_or(entry).trim()
}
