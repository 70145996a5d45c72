// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource-kind filters for change stream subscriptions

use serde::{Deserialize, Serialize};

use crate::event::ChangeEvent;

/// Pattern matched against a resource kind.
///
/// Kinds are split into `:`-separated segments:
///   - Exact: `access_request`
///   - Single wildcard: `access:*` matches `access:request`, not `access:request:review`
///   - Tail wildcard: `access:**` matches everything under `access`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindPattern(String);

impl KindPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn matches(&self, kind: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0 == "*" || self.0 == "**" {
            return true;
        }

        let pattern: Vec<&str> = self.0.split(':').collect();
        let kind: Vec<&str> = kind.split(':').collect();
        match_segments(&pattern, &kind)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn match_segments(pattern: &[&str], kind: &[&str]) -> bool {
    match (pattern.split_first(), kind.split_first()) {
        (None, None) => true,
        (Some((&"**", _)), _) => true,
        (Some((&"*", p_rest)), Some((_, k_rest))) => match_segments(p_rest, k_rest),
        (Some((p, p_rest)), Some((k, k_rest))) if p == k => match_segments(p_rest, k_rest),
        _ => false,
    }
}

/// Selection of resource kinds a subscriber wants to observe.
/// An empty filter selects every kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchFilter {
    #[serde(default)]
    pub kinds: Vec<KindPattern>,
}

impl WatchFilter {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(KindPattern::new).collect(),
        }
    }

    pub fn matches_kind(&self, kind: &str) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|p| p.matches(kind))
    }

    /// Init is connection-level and always passes
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.is_init() || self.matches_kind(&event.kind)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
