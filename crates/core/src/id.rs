// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types.
//!
//! `TargetName` wraps a validated target name (non-empty, no whitespace).
//! `BuildRequestId` is an opaque UUIDv4, minted fresh for every enqueued
//! build request.

use std::fmt;

/// A validated target name: non-empty, no whitespace, unique within a
/// project (uniqueness is enforced by the registry, not by this type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetName(String);

/// A target name failed validation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TargetNameError {
    #[error("target name must not be empty")]
    Empty,
    #[error("target name must not contain whitespace: {0:?}")]
    Whitespace(String),
}

impl TargetName {
    pub fn new(name: impl Into<String>) -> Result<Self, TargetNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TargetNameError::Empty);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(TargetNameError::Whitespace(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A filesystem-safe rendering of this name, for use as a state file
    /// stem: any character outside `[A-Za-z0-9_.-]` becomes `_`.
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TargetName {
    type Error = TargetNameError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetName> for String {
    fn from(value: TargetName) -> Self {
        value.0
    }
}

impl std::borrow::Borrow<str> for TargetName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TargetName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Unique identifier for a single build request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BuildRequestId(uuid::Uuid);

impl BuildRequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BuildRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
