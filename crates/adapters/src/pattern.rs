// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Pattern Matcher (C8): compiles a target's watch patterns once at
//! registration and tests changed paths against them. `**` matches any
//! number of path components (including zero), `*` matches within a single
//! component, `?` matches one character, and `[...]`/`[!...]` are character
//! classes — the exact semantics `glob::Pattern` implements.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid watch pattern {pattern:?}: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// A target's compiled watch patterns, tested as a set (order does not
/// affect matching — see `poltergeist_core::Target::watch_patterns`).
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<glob::Pattern>,
}

impl PatternSet {
    pub fn compile(raw_patterns: &[String]) -> Result<Self, PatternError> {
        let patterns = raw_patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|source| PatternError::Invalid {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if `path` matches any compiled pattern.
    pub fn matches(&self, path: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(path, options))
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
