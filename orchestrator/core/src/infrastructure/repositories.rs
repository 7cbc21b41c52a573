// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # In-Memory Collaborator Implementations
//!
//! Development and test adapters for the [`TaskStore`] and
//! [`AgentRegistry`] ports. Production deployments substitute persistent
//! implementations; the engine only ever sees the port traits.
//!
//! The task board guards its claim mutation with the lock manager when one
//! is attached — claims go through the same cross-process mutual-exclusion
//! substrate the agents themselves use, so two orchestrator processes
//! sharing a board directory cannot double-claim a task.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use hive_orchestrator_locks::LockManager;

use crate::domain::agent::{Agent, AgentConfig, AgentFilter, AgentId};
use crate::domain::repository::{AgentRegistry, ClaimOutcome, RepositoryError, TaskStore};
use crate::domain::task::{Task, TaskId, TaskPriority, TaskStatus};

/// Resource name locked around board mutation.
const BOARD_RESOURCE: &str = "orchestrator/task-board";

/// In-memory task board.
#[derive(Clone)]
pub struct InMemoryTaskStore {
    board: Arc<Mutex<Vec<Task>>>,
    locks: Option<Arc<LockManager>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            board: Arc::new(Mutex::new(Vec::new())),
            locks: None,
        }
    }

    /// Guard claim mutation with the cross-process lock manager.
    pub fn with_locks(locks: Arc<LockManager>) -> Self {
        Self {
            board: Arc::new(Mutex::new(Vec::new())),
            locks: Some(locks),
        }
    }

    /// Seed the board (test/dev helper).
    pub fn seed(&self, tasks: Vec<Task>) {
        self.board.lock().extend(tasks);
    }

    /// Force a task's status (test/dev helper, models external progress).
    pub fn set_status(&self, task_id: &TaskId, status: TaskStatus) {
        if let Some(task) = self.board.lock().iter_mut().find(|t| &t.id == task_id) {
            task.status = status;
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn read_board(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.board.lock().clone())
    }

    async fn claim_task(
        &self,
        task_id: &TaskId,
        agent_id: AgentId,
        _priority: TaskPriority,
    ) -> Result<ClaimOutcome, RepositoryError> {
        let holder = agent_id.to_string();

        // Claim state is lock-manager-protected when a manager is attached;
        // losing the board lock is a refused claim, not an error.
        if let Some(locks) = &self.locks {
            if let Err(e) = locks.acquire(BOARD_RESOURCE, &holder, None).await {
                return Ok(ClaimOutcome::refused(format!("board lock unavailable: {e}")));
            }
        }

        let outcome = {
            let mut board = self.board.lock();
            match board.iter_mut().find(|t| &t.id == task_id) {
                None => ClaimOutcome::refused(format!("unknown task '{task_id}'")),
                Some(task) if !task.is_claimable() => {
                    ClaimOutcome::refused(format!("task '{task_id}' already claimed"))
                }
                Some(task) => {
                    task.status = TaskStatus::Claimed;
                    debug!(task_id = %task_id, agent_id = %agent_id, "task claimed");
                    ClaimOutcome::claimed()
                }
            }
        };

        if let Some(locks) = &self.locks {
            // Release failures leave a token for staleness reclamation.
            let _ = locks.release(BOARD_RESOURCE, &holder).await;
        }
        Ok(outcome)
    }

    async fn available_tasks_for(
        &self,
        max: usize,
        capability_sets: &[Vec<String>],
    ) -> Result<Vec<Task>, RepositoryError> {
        let board = self.board.lock();
        let mut ranked: Vec<(usize, Task)> = board
            .iter()
            .filter(|t| t.is_claimable())
            .map(|t| {
                // Best capability coverage any agent offers for this task.
                let coverage = capability_sets
                    .iter()
                    .map(|set| {
                        t.required_capabilities
                            .iter()
                            .filter(|c| set.contains(c))
                            .count()
                    })
                    .max()
                    .unwrap_or(0);
                (coverage, t.clone())
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(ranked.into_iter().take(max).map(|(_, t)| t).collect())
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<Option<TaskStatus>, RepositoryError> {
        Ok(self
            .board
            .lock()
            .iter()
            .find(|t| &t.id == task_id)
            .map(|t| t.status))
    }
}

/// In-memory agent roster. Registration order is preserved, which keeps
/// round-robin rotation deterministic.
#[derive(Clone, Default)]
pub struct InMemoryAgentRegistry {
    agents: Arc<Mutex<Vec<Agent>>>,
}

impl InMemoryAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent_id: AgentId) -> Option<Agent> {
        self.agents.lock().iter().find(|a| a.id == agent_id).cloned()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn active_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, RepositoryError> {
        Ok(self
            .agents
            .lock()
            .iter()
            .filter(|a| filter.role.as_ref().is_none_or(|role| &a.role == role))
            .filter(|a| !filter.with_capacity || a.has_capacity())
            .cloned()
            .collect())
    }

    async fn update_workload(&self, agent_id: AgentId, delta: i32) -> Result<(), RepositoryError> {
        let mut agents = self.agents.lock();
        let agent = agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("agent {agent_id}")))?;
        agent.workload = agent.workload.saturating_add_signed(delta);
        Ok(())
    }

    async fn best_agent_for(&self, task: &Task) -> Result<Option<AgentId>, RepositoryError> {
        // Full required-capability coverage, spare capacity, least loaded.
        let agents = self.agents.lock();
        Ok(agents
            .iter()
            .filter(|a| a.has_capacity())
            .filter(|a| {
                task.required_capabilities
                    .iter()
                    .all(|c| a.has_capability(c))
            })
            .min_by_key(|a| a.workload)
            .map(|a| a.id))
    }

    async fn register(&self, config: AgentConfig) -> Result<AgentId, RepositoryError> {
        if config.name.trim().is_empty() {
            return Err(RepositoryError::Invalid("agent name must not be empty".into()));
        }
        if config.max_concurrent_tasks == 0 {
            return Err(RepositoryError::Invalid(
                "max_concurrent_tasks must be at least 1".into(),
            ));
        }
        let agent = Agent::from_config(config);
        let id = agent.id;
        self.agents.lock().push(agent);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str, capabilities: &[&str]) -> Task {
        Task {
            id: TaskId::new(id),
            mode: "dev".to_string(),
            priority: TaskPriority::Medium,
            specialization: None,
            required_capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
            status: TaskStatus::Pending,
        }
    }

    #[test]
    fn claim_flips_status_once() {
        let store = InMemoryTaskStore::new();
        store.seed(vec![pending("t1", &[])]);

        let first = tokio_test::block_on(store.claim_task(
            &TaskId::new("t1"),
            AgentId::new(),
            TaskPriority::Medium,
        ))
        .unwrap();
        assert!(first.success);

        let second = tokio_test::block_on(store.claim_task(
            &TaskId::new("t1"),
            AgentId::new(),
            TaskPriority::Medium,
        ))
        .unwrap();
        assert!(!second.success);
        assert!(second.reason.unwrap().contains("already claimed"));
    }

    #[test]
    fn available_tasks_rank_by_capability_coverage() {
        let store = InMemoryTaskStore::new();
        store.seed(vec![
            pending("uncovered", &["cobol"]),
            pending("covered", &["rust", "sql"]),
        ]);

        let sets = vec![vec!["rust".to_string(), "sql".to_string()]];
        let tasks = tokio_test::block_on(store.available_tasks_for(10, &sets)).unwrap();
        assert_eq!(tasks[0].id.as_str(), "covered");
    }

    #[test]
    fn best_agent_requires_full_coverage() {
        let registry = InMemoryAgentRegistry::new();
        tokio_test::block_on(registry.register(AgentConfig {
            name: "partial".into(),
            role: "dev".into(),
            specializations: vec![],
            capabilities: vec!["rust".into()],
            max_concurrent_tasks: 3,
        }))
        .unwrap();

        let task = pending("t1", &["rust", "sql"]);
        assert!(tokio_test::block_on(registry.best_agent_for(&task))
            .unwrap()
            .is_none());

        let full = tokio_test::block_on(registry.register(AgentConfig {
            name: "full".into(),
            role: "dev".into(),
            specializations: vec![],
            capabilities: vec!["rust".into(), "sql".into()],
            max_concurrent_tasks: 3,
        }))
        .unwrap();
        assert_eq!(
            tokio_test::block_on(registry.best_agent_for(&task)).unwrap(),
            Some(full)
        );
    }

    #[test]
    fn registration_validates_input() {
        let registry = InMemoryAgentRegistry::new();
        let err = tokio_test::block_on(registry.register(AgentConfig {
            name: "  ".into(),
            role: "dev".into(),
            specializations: vec![],
            capabilities: vec![],
            max_concurrent_tasks: 3,
        }))
        .unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)));
    }
}
