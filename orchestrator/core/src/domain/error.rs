// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Orchestration error taxonomy.
//!
//! Distribution and coordination calls report expected per-task failures
//! inside their result objects; these variants are for conditions that fail
//! a whole operation (empty candidate sets, malformed input, a lost claim
//! during grouped execution, a misbehaving collaborator). A coordination
//! running past its deadline is not an error anywhere: it surfaces as
//! `CoordinationStatus::Timeout` in the monitor summary and outcome.

use crate::domain::repository::RepositoryError;
use crate::domain::task::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no agents available for distribution")]
    NoAgentsAvailable,

    #[error("no tasks available for distribution")]
    NoTasksAvailable,

    #[error("insufficient agents: {required} required, {available} available")]
    InsufficientAgents { required: usize, available: usize },

    #[error("task '{task_id}' claim conflict: {reason}")]
    ClaimConflict { task_id: TaskId, reason: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
