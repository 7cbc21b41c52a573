// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # LockStore Port
//!
//! Persistence contract for lock tokens, defined in the domain layer and
//! implemented in `crate::infrastructure`. The filesystem adapter
//! ([`FsLockStore`]) is the default for local multi-agent use; a networked
//! backend (e.g. over a consensus store) can be substituted without
//! touching the [`LockManager`].
//!
//! [`FsLockStore`]: crate::infrastructure::FsLockStore
//! [`LockManager`]: crate::application::LockManager

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::error::LockStoreError;
use crate::domain::lock::{LockId, LockToken};

/// Result of an atomic token-creation attempt.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// This caller won the token.
    Created,
    /// Someone already holds it; their token is returned for staleness
    /// inspection.
    Held(LockToken),
}

/// Atomic creation, inspection, and removal of lock tokens.
///
/// `try_create` must guarantee a single winner under concurrent attempts
/// from any number of processes.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically create the token for `id`; at most one concurrent caller
    /// may observe `Created`.
    async fn try_create(&self, id: &LockId, token: &LockToken)
        -> Result<CreateOutcome, LockStoreError>;

    /// Read the current token, if any. A token that vanishes or is
    /// unreadable mid-read is reported as absent, not an error — the
    /// holder may have released it concurrently.
    async fn read(&self, id: &LockId) -> Result<Option<LockToken>, LockStoreError>;

    /// Remove the token. Returns whether a token existed.
    async fn remove(&self, id: &LockId) -> Result<bool, LockStoreError>;

    /// Where the token for `id` lives (diagnostic, shown in lock records).
    fn token_path(&self, id: &LockId) -> PathBuf;
}
