// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Orchestrator Facade
//!
//! The application-level entry point tying the engine together: session
//! initialization (agent registration), distribution passes, grouped
//! executions, monitoring, and statistics. Everything is injected —
//! collaborator ports and the lock manager arrive as `Arc`s at
//! construction, and `close()` ends the lifecycle explicitly.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use hive_orchestrator_locks::LockManager;

use crate::application::distributor::TaskDistributor;
use crate::application::monitor::{CoordinationMonitor, MonitorSummary};
use crate::domain::agent::{AgentConfig, AgentId};
use crate::domain::coordination::{ExecutionId, ExecutionOptions, ExecutionPlan};
use crate::domain::distribution::{DistributionConfig, DistributionResult};
use crate::domain::error::OrchestrationError;
use crate::domain::repository::{AgentRegistry, TaskStore};
use crate::domain::task::TaskId;

/// Result of [`Orchestrator::initialize_session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub registered_agents: Vec<AgentId>,
    pub failed_agents: Vec<FailedRegistration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRegistration {
    pub name: String,
    pub reason: String,
}

/// A planned grouped execution, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelExecution {
    pub execution_id: ExecutionId,
    pub plan: ExecutionPlan,
}

/// Cumulative engine metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationStatistics {
    pub distribution_passes: u64,
    pub tasks_assigned: u64,
    pub tasks_failed: u64,
    pub coordinations_active: usize,
    pub coordinations_completed: usize,
    pub coordinations_failed: usize,
    pub coordinations_timed_out: usize,
    pub active_locks: usize,
}

#[derive(Default)]
struct Counters {
    distribution_passes: u64,
    tasks_assigned: u64,
    tasks_failed: u64,
}

/// Top-level coordination service for one orchestrator process.
pub struct Orchestrator {
    registry: Arc<dyn AgentRegistry>,
    locks: Arc<LockManager>,
    distributor: TaskDistributor,
    monitor: CoordinationMonitor,
    counters: Mutex<Counters>,
}

impl Orchestrator {
    /// Wire the engine over its collaborators. Must run inside the tokio
    /// runtime: construction starts the lock manager's background stale
    /// sweeper, which `close()` aborts.
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        registry: Arc<dyn AgentRegistry>,
        locks: Arc<LockManager>,
    ) -> Self {
        locks.spawn_sweeper();
        Self {
            registry: Arc::clone(&registry),
            locks,
            distributor: TaskDistributor::new(Arc::clone(&tasks), registry),
            monitor: CoordinationMonitor::new(tasks),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Register a roster of agents for this session. Individual
    /// registration failures are collected, never fatal to the session.
    pub async fn initialize_session(&self, agent_configs: Vec<AgentConfig>) -> SessionReport {
        let session_id = Uuid::new_v4();
        let mut registered_agents = Vec::new();
        let mut failed_agents = Vec::new();

        for config in agent_configs {
            let name = config.name.clone();
            match self.registry.register(config).await {
                Ok(agent_id) => registered_agents.push(agent_id),
                Err(e) => {
                    warn!(agent = %name, error = %e, "agent registration failed");
                    failed_agents.push(FailedRegistration {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            %session_id,
            registered = registered_agents.len(),
            failed = failed_agents.len(),
            "session initialized"
        );
        SessionReport {
            session_id,
            registered_agents,
            failed_agents,
        }
    }

    /// Run one distribution pass and fold its counts into the statistics.
    pub async fn orchestrate_task_distribution(
        &self,
        config: &DistributionConfig,
    ) -> Result<DistributionResult, OrchestrationError> {
        let result = self.distributor.orchestrate(config).await?;
        let mut counters = self.counters.lock();
        counters.distribution_passes += 1;
        counters.tasks_assigned += result.total_assigned as u64;
        counters.tasks_failed += result.total_failed as u64;
        Ok(result)
    }

    /// Plan a grouped execution and register it with the monitor.
    pub async fn create_parallel_execution(
        &self,
        task_ids: &[TaskId],
        options: &ExecutionOptions,
    ) -> Result<ParallelExecution, OrchestrationError> {
        let (coordination, plan) = self
            .distributor
            .create_parallel_execution(task_ids, options)
            .await?;
        let execution_id = coordination.execution_id;
        self.monitor.track(coordination);
        Ok(ParallelExecution { execution_id, plan })
    }

    /// Advance and summarize every tracked coordination.
    pub async fn monitor_coordinations(&self) -> Result<MonitorSummary, OrchestrationError> {
        self.monitor.monitor().await
    }

    pub fn monitor(&self) -> &CoordinationMonitor {
        &self.monitor
    }

    pub fn get_orchestration_statistics(&self) -> OrchestrationStatistics {
        let (active, completed, failed, timed_out) = self.monitor.statistics();
        let counters = self.counters.lock();
        OrchestrationStatistics {
            distribution_passes: counters.distribution_passes,
            tasks_assigned: counters.tasks_assigned,
            tasks_failed: counters.tasks_failed,
            coordinations_active: active,
            coordinations_completed: completed,
            coordinations_failed: failed,
            coordinations_timed_out: timed_out,
            active_locks: self.locks.active_locks().len(),
        }
    }

    /// End of lifecycle: stops the lock sweeper and drops lock state.
    pub fn close(&self) {
        self.locks.close();
        info!("orchestrator closed");
    }
}
