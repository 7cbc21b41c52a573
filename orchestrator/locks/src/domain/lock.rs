// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lock Aggregate
//!
//! A [`Lock`] is exclusive ownership of one resource by one agent. The
//! invariant the whole crate exists to uphold: **at most one `Lock` per
//! resource at any instant**, across every process sharing the lock
//! directory.
//!
//! [`LockId`] is derived from the resource path so that every process,
//! regardless of working directory, maps the same resource to the same
//! token file.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identifier for a lock: the first 16 hex chars of the SHA-256 of
/// the normalized resource path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(String);

impl LockId {
    /// Derive the id for a resource.
    ///
    /// The resource string is normalized to an absolute, `.`/`..`-free path
    /// first, so `./src/lib.rs` and `src/lib.rs` collide on the same lock.
    /// Normalization is purely lexical; the resource does not need to exist.
    pub fn for_resource(resource: &str) -> Self {
        let canonical = normalize_resource_path(resource);
        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        Self(hex::encode(&digest[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lexical path normalization: absolute, no `.`/`..` components.
///
/// `std::fs::canonicalize` is deliberately not used — it fails for paths
/// that do not exist yet, and agents routinely lock files they are about
/// to create.
fn normalize_resource_path(resource: &str) -> PathBuf {
    let path = Path::new(resource);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// The JSON payload written to the token file.
///
/// `pid` and `hostname` identify the owning process for operators debugging
/// a wedged lock; they are informational, not part of the ownership check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockToken {
    pub lock_id: LockId,
    pub agent_id: String,
    pub acquired_at: DateTime<Utc>,
    pub pid: u32,
    pub hostname: String,
}

impl LockToken {
    pub fn new(lock_id: LockId, agent_id: impl Into<String>) -> Self {
        Self {
            lock_id,
            agent_id: agent_id.into(),
            acquired_at: Utc::now(),
            pid: std::process::id(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }

    /// Milliseconds since the token was written.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.acquired_at).num_milliseconds()
    }

    /// A token is stale once its age exceeds the configured timeout; a
    /// stale token is presumed abandoned by a crashed holder.
    pub fn is_stale(&self, timeout_ms: u64) -> bool {
        self.age_ms() > timeout_ms as i64
    }
}

/// In-memory record of a lock held by an agent of *this* process's manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub resource: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub token_path: PathBuf,
}

impl Lock {
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.acquired_at).num_milliseconds()
    }
}

/// Successful acquisition result handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockGrant {
    pub lock_id: LockId,
    pub resource: String,
    pub agent_id: String,
    pub acquired_at: DateTime<Utc>,
    /// True when the caller already held the lock and the acquire was a
    /// no-op (re-entrant success).
    pub reentrant: bool,
}

/// Tunables for the lock manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Directory holding `<lock_id>.lock` token files.
    pub lock_dir: PathBuf,
    /// Age after which a token is considered stale and reclaimable.
    pub timeout_ms: u64,
    /// Maximum attempts of the acquire retry loop.
    pub max_retries: u32,
    /// Sleep between attempts while the token is held and fresh.
    pub retry_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_dir: PathBuf::from(".hive/locks"),
            timeout_ms: 30_000,
            max_retries: 50,
            retry_interval_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_id_is_stable_across_spellings() {
        let a = LockId::for_resource("src/./main.rs");
        let b = LockId::for_resource("src/main.rs");
        assert_eq!(a, b);
    }

    #[test]
    fn lock_id_is_sixteen_hex_chars() {
        let id = LockId::for_resource("/tmp/some/resource.json");
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn distinct_resources_get_distinct_ids() {
        assert_ne!(
            LockId::for_resource("/a/file.rs"),
            LockId::for_resource("/b/file.rs")
        );
    }

    #[test]
    fn fresh_token_is_not_stale() {
        let token = LockToken::new(LockId::for_resource("/r"), "agent-1");
        assert!(!token.is_stale(30_000));
    }

    #[test]
    fn old_token_is_stale() {
        let mut token = LockToken::new(LockId::for_resource("/r"), "agent-1");
        token.acquired_at = Utc::now() - chrono::Duration::milliseconds(31_000);
        assert!(token.is_stale(30_000));
    }

    #[test]
    fn token_carries_process_provenance() {
        let token = LockToken::new(LockId::for_resource("/r"), "agent-1");
        assert_eq!(token.pid, std::process::id());
        assert!(!token.hostname.is_empty());
    }
}
