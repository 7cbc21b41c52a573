// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Conflict Advisory Types
//!
//! Non-blocking "who else is touching this resource" inspection. A
//! [`ConflictReport`] never prevents an operation; it informs the caller so
//! it can choose a [`ResolutionStrategy`] before mutating shared state.

use serde::{Deserialize, Serialize};

/// The operation the asking agent intends to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    None,
    Medium,
    High,
}

/// A single source of contention on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// Another agent currently holds the lock.
    HeldByOther { resource: String, holder: String },
    /// Other agents have pending acquisition requests.
    PendingRequests { resource: String, agents: Vec<String> },
}

/// Advisory result of [`LockManager::detect_conflicts`].
///
/// [`LockManager::detect_conflicts`]: crate::application::LockManager::detect_conflicts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub severity: ConflictSeverity,
    pub conflicts: Vec<Conflict>,
    pub recommendation: String,
}

impl ConflictReport {
    /// Classify a set of observed conflicts for an intended operation.
    ///
    /// A write against *any* contention is High — the caller is about to
    /// mutate state someone else is using. Reads against contention are
    /// Medium. No contention is None.
    pub fn classify(conflicts: Vec<Conflict>, mode: AccessMode) -> Self {
        let severity = if conflicts.is_empty() {
            ConflictSeverity::None
        } else if mode == AccessMode::Write {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        };
        let recommendation = match severity {
            ConflictSeverity::None => "proceed".to_string(),
            ConflictSeverity::Medium => {
                "proceed with awareness; holders may change the resource".to_string()
            }
            ConflictSeverity::High => {
                "acquire the lock and wait, or coordinate with the current holder".to_string()
            }
        };
        Self {
            has_conflicts: !conflicts.is_empty(),
            severity,
            conflicts,
            recommendation,
        }
    }
}

/// How a caller wants a detected conflict handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    Merge,
    Queue,
    Force,
    Abort,
}

/// Outcome of [`LockManager::resolve_conflict`].
///
/// `merge`, `queue`, and `force` describe the action to take; the concrete
/// merge/queue/force machinery is an extension seam for callers that own
/// the resource semantics. `abort` is the only strategy with complete
/// semantics here: the operation is not performed.
///
/// [`LockManager::resolve_conflict`]: crate::application::LockManager::resolve_conflict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub success: bool,
    pub strategy: ResolutionStrategy,
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(holder: &str) -> Conflict {
        Conflict::HeldByOther {
            resource: "/r".to_string(),
            holder: holder.to_string(),
        }
    }

    #[test]
    fn no_contention_is_none() {
        let report = ConflictReport::classify(vec![], AccessMode::Write);
        assert!(!report.has_conflicts);
        assert_eq!(report.severity, ConflictSeverity::None);
    }

    #[test]
    fn write_against_contention_is_high() {
        let report = ConflictReport::classify(vec![held("b")], AccessMode::Write);
        assert!(report.has_conflicts);
        assert_eq!(report.severity, ConflictSeverity::High);
    }

    #[test]
    fn read_against_contention_is_medium() {
        let report = ConflictReport::classify(vec![held("b")], AccessMode::Read);
        assert_eq!(report.severity, ConflictSeverity::Medium);
    }
}
