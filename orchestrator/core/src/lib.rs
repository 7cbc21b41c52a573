// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-orchestrator-core` — Task Distribution & Coordination Crate
//!
//! Matches available agents to available tasks and tracks groups of tasks
//! executing together.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Agent`, `Task`, `Coordination`, `DistributionResult`, collaborator ports |
//! | [`application`] | Application | `TaskDistributor`, `CoordinationMonitor`, `Orchestrator` facade |
//! | [`infrastructure`] | Infrastructure | In-memory `TaskStore` / `AgentRegistry`, YAML configuration |
//!
//! ## Key Concepts
//!
//! - **Distribution pass**: one call matching agents to tasks under a
//!   single strategy. Claims are strictly sequential within a pass —
//!   workload counters are read-then-incremented on pass-local copies, so
//!   a pass is a single loop by construction, never a concurrent fan-out.
//! - **Coordination**: a tracked group of tasks executing together, either
//!   as independent peers or under a coordinator/worker split. Mutated only
//!   by the [`application::CoordinationMonitor`]; terminal once completed,
//!   failed, or timed out.
//! - **Compatibility score**: the greedy heuristic ranking used by the
//!   `intelligent` strategy. It is a documented heuristic, not an optimal
//!   bipartite assignment.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{CoordinationMonitor, Orchestrator, TaskDistributor};
pub use domain::*;
