// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lock error taxonomy.
//!
//! Expected contention (timeout, deadlock, ownership mismatch) is carried
//! as typed variants so batch callers can match and continue; none of these
//! conditions panics or aborts a distribution pass.

use crate::domain::waitgraph::DeadlockChain;

/// Errors surfaced by the lock manager.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The retry budget was exhausted while another holder kept the lock.
    #[error("lock acquisition timed out after {retry_count} attempts")]
    Timeout { retry_count: u32 },

    /// Acquiring would close a wait cycle; failed fast before blocking.
    #[error("deadlock detected: {chain}")]
    Deadlock { chain: DeadlockChain },

    /// Release attempted by an agent that is not the recorded holder.
    #[error("lock is held by '{holder}', not the releasing agent")]
    NotOwner { holder: String },

    /// Release attempted on a resource with no recorded lock.
    #[error("no lock is held on this resource")]
    NotHeld,

    /// The manager is in permanent soft-fail mode: the lock directory could
    /// not be created at startup.
    #[error("lock directory unavailable: {0}")]
    Directory(String),

    #[error(transparent)]
    Store(#[from] LockStoreError),
}

/// Errors from the token store backend.
#[derive(Debug, thiserror::Error)]
pub enum LockStoreError {
    #[error("lock store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock token serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
