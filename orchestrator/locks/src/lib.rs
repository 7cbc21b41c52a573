// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-orchestrator-locks` — Cross-Process Lock Coordination Crate
//!
//! Mutual exclusion for concurrently-running agent processes sharing one
//! filesystem, plus proactive deadlock detection over the wait-for graph.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Lock`, `LockId`, `LockToken`, `WaitForGraph`, conflict advisory types |
//! | [`application`] | Application | `LockManager` acquire/release/sweep service |
//! | [`infrastructure`] | Infrastructure | `FsLockStore` filesystem token store |
//!
//! ## Key Concepts
//!
//! - **Lock token**: a JSON file at `<lock_dir>/<lock_id>.lock` whose atomic
//!   creation is the synchronization primitive. There is no central lock
//!   server; any process that can see the directory participates.
//! - **Wait-for graph**: directed edges from a waiting agent to the locks it
//!   is currently requesting. Cycle detection runs *before* an acquisition
//!   blocks, so an actual deadlock is never allowed to form.
//! - **Stale lock**: a token older than the configured timeout, reclaimable
//!   by any requester without an explicit release (crashed-holder recovery).
//!
//! The token-file backend is one implementation of the [`domain::LockStore`]
//! port; a networked store can be substituted without touching callers.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::LockManager;
pub use domain::*;
pub use infrastructure::FsLockStore;
