// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Collaborator Ports
//!
//! Contracts for the external stores this engine consumes, following the
//! one-port-per-collaborator pattern: interface defined here, adapters in
//! `crate::infrastructure` (in-memory, for development and tests) or in
//! downstream crates (persistent stores).
//!
//! | Trait | Collaborator | Consumed by |
//! |-------|--------------|-------------|
//! | [`TaskStore`] | shared task board | distributor, monitor |
//! | [`AgentRegistry`] | agent roster | distributor, orchestrator |
//!
//! Expected contention on claims is data ([`ClaimOutcome`]), not an error:
//! a distribution pass must be able to note a lost claim race and keep
//! going. `Err` from these ports means the store itself misbehaved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{Agent, AgentConfig, AgentFilter, AgentId};
use crate::domain::task::{Task, TaskId, TaskPriority, TaskStatus};

/// Result of a claim attempt against the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    /// Why the claim was refused (task already claimed, unknown task, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClaimOutcome {
    pub fn claimed() -> Self {
        Self {
            success: true,
            claimed_at: Some(Utc::now()),
            reason: None,
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            claimed_at: None,
            reason: Some(reason.into()),
        }
    }
}

/// The shared task board.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task currently on the board, any status.
    async fn read_board(&self) -> Result<Vec<Task>, RepositoryError>;

    /// Atomically claim `task_id` for `agent_id`. Losing a race is an
    /// unsuccessful [`ClaimOutcome`], not an `Err`.
    async fn claim_task(
        &self,
        task_id: &TaskId,
        agent_id: AgentId,
        priority: TaskPriority,
    ) -> Result<ClaimOutcome, RepositoryError>;

    /// Up to `max` claimable tasks, ranked for the given agent capability
    /// sets (best-covered tasks first).
    async fn available_tasks_for(
        &self,
        max: usize,
        capability_sets: &[Vec<String>],
    ) -> Result<Vec<Task>, RepositoryError>;

    /// Current status of one task, `None` when the board has no such task.
    async fn task_status(&self, task_id: &TaskId) -> Result<Option<TaskStatus>, RepositoryError>;
}

/// The agent roster.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn active_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, RepositoryError>;

    /// Apply a workload delta to the system of record (local pass copies
    /// track it separately; see the distributor).
    async fn update_workload(&self, agent_id: AgentId, delta: i32) -> Result<(), RepositoryError>;

    /// The registry's own idea of the single best agent for a task, or
    /// `None` when nobody qualifies. Opaque matcher.
    async fn best_agent_for(&self, task: &Task) -> Result<Option<AgentId>, RepositoryError>;

    async fn register(&self, config: AgentConfig) -> Result<AgentId, RepositoryError>;
}

/// Collaborator store errors (unexpected failures, not contention).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("invalid entity: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
