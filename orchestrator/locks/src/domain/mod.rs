// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lock Coordination Domain Types
//!
//! Value objects and invariants for the locking substrate:
//!
//! - [`Lock`] / [`LockId`] / [`LockToken`] — the mutual-exclusion aggregate.
//! - [`WaitForGraph`] / [`DeadlockChain`] — proactive deadlock detection.
//! - [`ConflictReport`] / [`ResolutionStrategy`] — non-blocking advisory.
//! - [`LockStore`] — the pluggable token-persistence port.

pub mod conflict;
pub mod error;
pub mod lock;
pub mod store;
pub mod waitgraph;

pub use conflict::{
    AccessMode, Conflict, ConflictReport, ConflictSeverity, Resolution, ResolutionStrategy,
};
pub use error::{LockError, LockStoreError};
pub use lock::{Lock, LockConfig, LockGrant, LockId, LockToken};
pub use store::{CreateOutcome, LockStore};
pub use waitgraph::{DeadlockChain, WaitForGraph};
