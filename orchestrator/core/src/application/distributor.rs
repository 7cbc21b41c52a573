// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Distributor Application Service
//!
//! Matches available agents to available tasks under one of four
//! interchangeable strategies and claims tasks through the [`TaskStore`].
//!
//! ## Single-pass discipline
//!
//! Claims are **sequential within a pass**, never concurrent. Workload
//! counters are read-then-incremented on pass-local agent copies (the
//! `AgentPool`); the pool is owned `&mut` by exactly one strategy loop,
//! so the compiler enforces the single-writer rule instead of leaving it
//! to loop ordering. Reintroducing concurrency here
//! requires moving the pool behind a mutex or a dedicated owner task.
//!
//! Per-pair claim failures are caught and recorded as
//! [`FailedAssignment`](crate::domain::distribution::FailedAssignment)s;
//! one failure never aborts the pass.
//!
//! The intelligent strategy is a greedy heuristic over scored pairs, not an
//! optimal bipartite assignment.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::agent::{Agent, AgentFilter, AgentId};
use crate::domain::coordination::{
    Coordination, CoordinationType, ExecutionOptions, ExecutionPlan, WorkerAssignment,
};
use crate::domain::distribution::{DistributionConfig, DistributionResult, DistributionStrategy};
use crate::domain::error::OrchestrationError;
use crate::domain::repository::{AgentRegistry, TaskStore};
use crate::domain::task::{Task, TaskId, TaskPriority};

/// Pass-local view of the candidate agents.
///
/// Owns the only mutable workload counters in a pass; every strategy goes
/// through `bump` so local increments stay in one place.
struct AgentPool {
    agents: Vec<Agent>,
}

impl AgentPool {
    fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    fn len(&self) -> usize {
        self.agents.len()
    }

    fn get(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &Agent)> {
        self.agents.iter().enumerate()
    }

    fn bump(&mut self, index: usize) {
        self.agents[index].workload += 1;
    }

    /// Ascending by workload; stable, so equal loads keep roster order.
    fn sort_by_workload(&mut self) {
        self.agents.sort_by_key(|a| a.workload);
    }

    fn first_with_capacity(&self) -> Option<usize> {
        self.agents.iter().position(Agent::has_capacity)
    }

    fn capability_sets(&self) -> Vec<Vec<String>> {
        self.agents.iter().map(|a| a.capabilities.clone()).collect()
    }
}

/// The compatibility score used by the intelligent strategy.
///
/// `+50` role matches mode (case-insensitive on the mode), `+30`
/// specialization match, `+10` per covered required capability, `+20`/`+10`
/// for high/medium priority, `−5` per unit of current workload, floored
/// at zero.
fn compatibility_score(agent: &Agent, task: &Task) -> i64 {
    let mut score: i64 = 0;
    if agent.role == task.mode.to_lowercase() {
        score += 50;
    }
    if let Some(specialization) = &task.specialization {
        if agent.specializations.iter().any(|s| s == specialization) {
            score += 30;
        }
    }
    score += 10
        * task
            .required_capabilities
            .iter()
            .filter(|c| agent.has_capability(c))
            .count() as i64;
    score += match task.priority {
        TaskPriority::High => 20,
        TaskPriority::Medium => 10,
        TaskPriority::Low => 0,
    };
    score -= 5 * i64::from(agent.workload);
    score.max(0)
}

/// Matches agents to tasks and claims through the task store.
pub struct TaskDistributor {
    tasks: Arc<dyn TaskStore>,
    registry: Arc<dyn AgentRegistry>,
}

impl TaskDistributor {
    pub fn new(tasks: Arc<dyn TaskStore>, registry: Arc<dyn AgentRegistry>) -> Self {
        Self { tasks, registry }
    }

    /// Run one distribution pass.
    ///
    /// Fails fast with [`OrchestrationError::NoAgentsAvailable`] /
    /// [`OrchestrationError::NoTasksAvailable`] when either candidate set
    /// is empty; otherwise dispatches to exactly one strategy and reports
    /// every success and failure in the returned [`DistributionResult`].
    pub async fn orchestrate(
        &self,
        config: &DistributionConfig,
    ) -> Result<DistributionResult, OrchestrationError> {
        let mut filter = config.agent_filter.clone();
        filter.with_capacity = true;
        let agents = self.registry.active_agents(&filter).await?;
        let agents: Vec<Agent> = agents.into_iter().filter(Agent::has_capacity).collect();
        if agents.is_empty() {
            return Err(OrchestrationError::NoAgentsAvailable);
        }

        let mut pool = AgentPool::new(agents);
        let tasks = self
            .tasks
            .available_tasks_for(config.max_tasks, &pool.capability_sets())
            .await?;
        if tasks.is_empty() {
            return Err(OrchestrationError::NoTasksAvailable);
        }

        debug!(
            strategy = ?config.strategy,
            agents = pool.len(),
            tasks = tasks.len(),
            "starting distribution pass"
        );
        let result = match config.strategy {
            DistributionStrategy::Intelligent => self.distribute_intelligent(&mut pool, &tasks).await,
            DistributionStrategy::RoundRobin => self.distribute_round_robin(&mut pool, &tasks).await,
            DistributionStrategy::CapabilityBased => {
                self.distribute_capability_based(&tasks).await
            }
            DistributionStrategy::LoadBalanced => {
                self.distribute_load_balanced(&mut pool, &tasks).await
            }
        };
        info!(
            strategy = ?config.strategy,
            assigned = result.total_assigned,
            failed = result.total_failed,
            "distribution pass finished"
        );
        Ok(result)
    }

    /// Scored greedy matching: rank every pair with spare capacity, then
    /// consume descending, skipping pairs whose agent or task is used.
    /// Stable sort means ties keep pair enumeration order.
    async fn distribute_intelligent(
        &self,
        pool: &mut AgentPool,
        tasks: &[Task],
    ) -> DistributionResult {
        let mut pairs: Vec<(i64, usize, usize)> = Vec::new();
        for (agent_index, agent) in pool.iter() {
            if !agent.has_capacity() {
                continue;
            }
            for (task_index, task) in tasks.iter().enumerate() {
                pairs.push((compatibility_score(agent, task), agent_index, task_index));
            }
        }
        pairs.sort_by(|a, b| b.0.cmp(&a.0));

        let mut result = DistributionResult::default();
        let mut used_agents: HashSet<usize> = HashSet::new();
        let mut used_tasks: HashSet<usize> = HashSet::new();

        for (score, agent_index, task_index) in pairs {
            if used_agents.contains(&agent_index) || used_tasks.contains(&task_index) {
                continue;
            }
            let task = &tasks[task_index];
            let agent_id = pool.get(agent_index).id;
            // Agent and task are consumed only by a successful claim; a
            // refusal is recorded and the task stays available to the next
            // scored pair.
            if self.try_claim(agent_id, task, Some(score), &mut result).await {
                used_agents.insert(agent_index);
                used_tasks.insert(task_index);
                pool.bump(agent_index);
            }
        }
        result
    }

    /// Cycle through the roster per task. An at-capacity agent forfeits its
    /// turn (the task is recorded as failed, not requeued) and the index
    /// still advances.
    async fn distribute_round_robin(
        &self,
        pool: &mut AgentPool,
        tasks: &[Task],
    ) -> DistributionResult {
        let mut result = DistributionResult::default();
        for (task_index, task) in tasks.iter().enumerate() {
            let agent_index = task_index % pool.len();
            let agent = pool.get(agent_index);
            if !agent.has_capacity() {
                result.record_failure(
                    Some(agent.id),
                    task.id.clone(),
                    "agent at capacity for this turn",
                );
                continue;
            }
            let agent_id = agent.id;
            if self.try_claim(agent_id, task, None, &mut result).await {
                pool.bump(agent_index);
            }
        }
        result
    }

    /// Delegate agent choice to the registry's opaque matcher per task.
    async fn distribute_capability_based(&self, tasks: &[Task]) -> DistributionResult {
        let mut result = DistributionResult::default();
        for task in tasks {
            match self.registry.best_agent_for(task).await {
                Ok(Some(agent_id)) => {
                    self.try_claim(agent_id, task, None, &mut result).await;
                }
                Ok(None) => {
                    result.record_failure(None, task.id.clone(), "No suitable agent found");
                }
                Err(e) => {
                    result.record_failure(
                        None,
                        task.id.clone(),
                        format!("agent matching failed: {e}"),
                    );
                }
            }
        }
        result
    }

    /// Always hand the task to the least-loaded agent with spare capacity;
    /// re-sort after every successful claim so the next task sees fresh
    /// loads.
    async fn distribute_load_balanced(
        &self,
        pool: &mut AgentPool,
        tasks: &[Task],
    ) -> DistributionResult {
        let mut result = DistributionResult::default();
        pool.sort_by_workload();
        for task in tasks {
            let Some(agent_index) = pool.first_with_capacity() else {
                result.record_failure(None, task.id.clone(), "no agent with spare capacity");
                continue;
            };
            let agent_id = pool.get(agent_index).id;
            if self.try_claim(agent_id, task, None, &mut result).await {
                pool.bump(agent_index);
                pool.sort_by_workload();
            }
        }
        result
    }

    /// One sequential claim attempt. Lost races and store errors are both
    /// recorded as failed assignments; the pass always continues.
    async fn try_claim(
        &self,
        agent_id: AgentId,
        task: &Task,
        score: Option<i64>,
        result: &mut DistributionResult,
    ) -> bool {
        match self.tasks.claim_task(&task.id, agent_id, task.priority).await {
            Ok(outcome) if outcome.success => {
                if let Err(e) = self.registry.update_workload(agent_id, 1).await {
                    // The pass-local counter is authoritative for this pass;
                    // registry sync failure is logged, not fatal.
                    warn!(%agent_id, task_id = %task.id, error = %e, "workload update failed");
                }
                result.record_assignment(agent_id, task.id.clone(), score);
                true
            }
            Ok(outcome) => {
                result.record_failure(
                    Some(agent_id),
                    task.id.clone(),
                    outcome.reason.unwrap_or_else(|| "task already claimed".to_string()),
                );
                false
            }
            Err(e) => {
                result.record_failure(Some(agent_id), task.id.clone(), format!("claim error: {e}"));
                false
            }
        }
    }

    /// Plan a grouped execution over specific tasks.
    ///
    /// Requires one available agent per task, plus one more when a
    /// coordinator is requested (the coordinator claims nothing). Every
    /// worker must claim its task; a refused claim fails the request with
    /// [`OrchestrationError::ClaimConflict`], leaving tasks claimed by
    /// earlier workers in place for the caller to reconcile. Returns the
    /// `Active` coordination record and the chosen topology; the caller
    /// registers the record with the monitor.
    pub async fn create_parallel_execution(
        &self,
        task_ids: &[TaskId],
        options: &ExecutionOptions,
    ) -> Result<(Coordination, ExecutionPlan), OrchestrationError> {
        if task_ids.is_empty() {
            return Err(OrchestrationError::Validation(
                "parallel execution requires at least one task".to_string(),
            ));
        }

        let filter = AgentFilter {
            role: None,
            with_capacity: true,
        };
        let agents = self.registry.active_agents(&filter).await?;
        let required = task_ids.len() + usize::from(options.coordinator_required);
        if agents.len() < required {
            return Err(OrchestrationError::InsufficientAgents {
                required,
                available: agents.len(),
            });
        }

        let board = self.tasks.read_board().await?;
        let kind = if options.coordinator_required {
            CoordinationType::Coordinated
        } else {
            CoordinationType::Parallel
        };
        let (coordinator, worker_agents) = if options.coordinator_required {
            (Some(agents[0].id), &agents[1..])
        } else {
            (None, &agents[..])
        };

        let mut workers = Vec::with_capacity(task_ids.len());
        for (agent, task_id) in worker_agents.iter().zip(task_ids) {
            let priority = board
                .iter()
                .find(|t| &t.id == task_id)
                .map_or(TaskPriority::Medium, |t| t.priority);
            let outcome = self.tasks.claim_task(task_id, agent.id, priority).await?;
            if !outcome.success {
                let reason = outcome
                    .reason
                    .unwrap_or_else(|| "task already claimed".to_string());
                warn!(task_id = %task_id, agent_id = %agent.id, reason = %reason, "parallel execution claim refused");
                return Err(OrchestrationError::ClaimConflict {
                    task_id: task_id.clone(),
                    reason,
                });
            }
            workers.push(WorkerAssignment {
                agent_id: agent.id,
                task_id: task_id.clone(),
            });
        }

        let coordination = Coordination::new(kind, task_ids.to_vec(), options.timeout_ms);
        info!(
            execution_id = %coordination.execution_id,
            ?kind,
            tasks = task_ids.len(),
            "parallel execution planned"
        );
        Ok((coordination, ExecutionPlan { coordinator, workers }))
    }
}
