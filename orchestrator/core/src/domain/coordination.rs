// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Coordination Aggregate
//!
//! A [`Coordination`] is a tracked group of tasks executing together —
//! either as independent peers (`parallel`) or under a coordinator/worker
//! split (`coordinated`). Created when a caller requests grouped execution;
//! mutated only by the `CoordinationMonitor`; terminal once `Completed`,
//! `Failed`, or `Timeout`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationType {
    /// Independent peers, no designated coordinator.
    Parallel,
    /// First agent coordinates; the rest claim one task each.
    Coordinated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationStatus {
    Active,
    Completed,
    Failed,
    Timeout,
}

impl CoordinationStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::Active
    }
}

/// A tracked group of tasks executing together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordination {
    pub execution_id: ExecutionId,
    pub kind: CoordinationType,
    pub task_ids: Vec<TaskId>,
    pub started_at: DateTime<Utc>,
    pub timeout_ms: u64,
    pub status: CoordinationStatus,
}

impl Coordination {
    pub fn new(kind: CoordinationType, task_ids: Vec<TaskId>, timeout_ms: u64) -> Self {
        Self {
            execution_id: ExecutionId::new(),
            kind,
            task_ids,
            started_at: Utc::now(),
            timeout_ms,
            status: CoordinationStatus::Active,
        }
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_milliseconds()
    }

    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_ms(now) > self.timeout_ms as i64
    }
}

/// Options for grouped execution requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    pub coordinator_required: bool,
    pub timeout_ms: u64,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            coordinator_required: false,
            timeout_ms: 300_000,
        }
    }
}

/// One worker's slot in an execution plan. A plan is only returned when
/// every worker's claim went through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub agent_id: AgentId,
    pub task_id: TaskId,
}

/// The agent topology chosen for a grouped execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Present only for coordinated executions.
    pub coordinator: Option<AgentId>,
    pub workers: Vec<WorkerAssignment>,
}

/// Terminal record stored when a coordination leaves `Active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationOutcome {
    pub execution_id: ExecutionId,
    pub status: CoordinationStatus,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub total_tasks: usize,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}
