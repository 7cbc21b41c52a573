// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Distribution Strategy Types
//!
//! Strategy selection, pass configuration, and the uniform result shape
//! every strategy returns. Nothing is silently dropped: each pass reports
//! both its assignments and its failures in one [`DistributionResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentFilter, AgentId};
use crate::domain::task::TaskId;

/// The four interchangeable matching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    /// Scored greedy matching over every (agent, task) pair.
    Intelligent,
    /// `agents[task_index % agents.len()]`, skipping at-capacity turns.
    RoundRobin,
    /// Delegates agent choice to the registry's matcher per task.
    CapabilityBased,
    /// Always the least-loaded agent with spare capacity.
    LoadBalanced,
}

impl Default for DistributionStrategy {
    fn default() -> Self {
        Self::Intelligent
    }
}

/// Configuration for one distribution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub max_tasks: usize,
    pub strategy: DistributionStrategy,
    pub agent_filter: AgentFilter,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            max_tasks: 10,
            strategy: DistributionStrategy::default(),
            agent_filter: AgentFilter::default(),
        }
    }
}

/// One successful claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: AgentId,
    pub task_id: TaskId,
    /// Compatibility score; only the intelligent strategy produces one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    pub claimed_at: DateTime<Utc>,
}

/// One task that could not be assigned in this pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAssignment {
    /// The agent we tried, when one was selected before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    pub task_id: TaskId,
    pub reason: String,
}

/// Uniform output of every strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionResult {
    pub assignments: Vec<Assignment>,
    pub failed_assignments: Vec<FailedAssignment>,
    pub total_assigned: usize,
    pub total_failed: usize,
}

impl DistributionResult {
    pub fn record_assignment(&mut self, agent_id: AgentId, task_id: TaskId, score: Option<i64>) {
        self.assignments.push(Assignment {
            agent_id,
            task_id,
            score,
            claimed_at: Utc::now(),
        });
        self.total_assigned += 1;
    }

    pub fn record_failure(
        &mut self,
        agent_id: Option<AgentId>,
        task_id: TaskId,
        reason: impl Into<String>,
    ) {
        self.failed_assignments.push(FailedAssignment {
            agent_id,
            task_id,
            reason: reason.into(),
        });
        self.total_failed += 1;
    }
}
