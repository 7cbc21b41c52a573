// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end tests for the orchestrator facade: session initialization,
//! distribution with statistics, grouped executions flowing into the
//! monitor, and explicit lifecycle shutdown.

use std::sync::Arc;

use hive_orchestrator_core::domain::repository::{AgentRegistry, TaskStore};
use hive_orchestrator_core::infrastructure::{InMemoryAgentRegistry, InMemoryTaskStore};
use hive_orchestrator_core::{
    AgentConfig, CoordinationStatus, DistributionConfig, DistributionStrategy, ExecutionOptions,
    Orchestrator, OrchestrationError, Task, TaskId, TaskPriority, TaskStatus,
};
use hive_orchestrator_locks::{LockConfig, LockManager};

fn agent(name: &str, role: &str) -> AgentConfig {
    AgentConfig {
        name: name.to_string(),
        role: role.to_string(),
        specializations: vec![],
        capabilities: vec![],
        max_concurrent_tasks: 3,
    }
}

fn pending(id: &str) -> Task {
    Task {
        id: TaskId::new(id),
        mode: "dev".to_string(),
        priority: TaskPriority::Medium,
        specialization: None,
        required_capabilities: vec![],
        status: TaskStatus::Pending,
    }
}

fn build(lock_dir: &std::path::Path) -> (Orchestrator, Arc<InMemoryTaskStore>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let locks = Arc::new(LockManager::with_fs_store(LockConfig {
        lock_dir: lock_dir.to_path_buf(),
        ..LockConfig::default()
    }));
    let store = Arc::new(InMemoryTaskStore::with_locks(Arc::clone(&locks)));
    let registry = Arc::new(InMemoryAgentRegistry::new());
    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry as Arc<dyn AgentRegistry>,
        locks,
    );
    (orchestrator, store)
}

#[tokio::test]
async fn session_collects_registration_failures_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _) = build(dir.path());

    let report = orchestrator
        .initialize_session(vec![
            agent("dev-1", "dev"),
            agent("", "dev"), // rejected by the registry
            agent("dev-2", "dev"),
        ])
        .await;
    assert_eq!(report.registered_agents.len(), 2);
    assert_eq!(report.failed_agents.len(), 1);
    assert!(report.failed_agents[0].reason.contains("name"));
}

#[tokio::test]
async fn distribution_updates_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store) = build(dir.path());
    orchestrator.initialize_session(vec![agent("dev-1", "dev")]).await;
    store.seed(vec![pending("t1"), pending("t2")]);

    let result = orchestrator
        .orchestrate_task_distribution(&DistributionConfig {
            strategy: DistributionStrategy::RoundRobin,
            ..DistributionConfig::default()
        })
        .await
        .unwrap();
    assert_eq!(result.total_assigned, 2);

    let stats = orchestrator.get_orchestration_statistics();
    assert_eq!(stats.distribution_passes, 1);
    assert_eq!(stats.tasks_assigned, 2);
    assert_eq!(stats.tasks_failed, 0);
}

#[tokio::test]
async fn parallel_execution_is_tracked_until_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store) = build(dir.path());
    orchestrator
        .initialize_session(vec![agent("w-1", "dev"), agent("w-2", "dev"), agent("c", "dev")])
        .await;
    store.seed(vec![pending("t1"), pending("t2")]);

    let execution = orchestrator
        .create_parallel_execution(
            &[TaskId::new("t1"), TaskId::new("t2")],
            &ExecutionOptions {
                coordinator_required: true,
                timeout_ms: 60_000,
            },
        )
        .await
        .unwrap();
    assert!(execution.plan.coordinator.is_some());
    assert_eq!(execution.plan.workers.len(), 2);

    let summary = orchestrator.monitor_coordinations().await.unwrap();
    assert_eq!(summary.active, 1);

    store.set_status(&TaskId::new("t1"), TaskStatus::Completed);
    store.set_status(&TaskId::new("t2"), TaskStatus::Completed);
    let summary = orchestrator.monitor_coordinations().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(
        orchestrator.monitor().outcome_of(execution.execution_id).unwrap().status,
        CoordinationStatus::Completed
    );
}

#[tokio::test]
async fn parallel_execution_requires_enough_agents() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store) = build(dir.path());
    orchestrator.initialize_session(vec![agent("only", "dev")]).await;
    store.seed(vec![pending("t1"), pending("t2")]);

    match orchestrator
        .create_parallel_execution(
            &[TaskId::new("t1"), TaskId::new("t2")],
            &ExecutionOptions::default(),
        )
        .await
    {
        Err(OrchestrationError::InsufficientAgents { required, available }) => {
            assert_eq!(required, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientAgents, got {other:?}"),
    }
}

#[tokio::test]
async fn coordinator_mode_needs_one_agent_beyond_the_workers() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store) = build(dir.path());
    // Exactly one agent per task is enough for peer mode, but a
    // coordinator occupies a slot of its own.
    orchestrator
        .initialize_session(vec![agent("w-1", "dev"), agent("w-2", "dev")])
        .await;
    store.seed(vec![pending("t1"), pending("t2")]);

    match orchestrator
        .create_parallel_execution(
            &[TaskId::new("t1"), TaskId::new("t2")],
            &ExecutionOptions {
                coordinator_required: true,
                timeout_ms: 60_000,
            },
        )
        .await
    {
        Err(OrchestrationError::InsufficientAgents { required, available }) => {
            assert_eq!(required, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected InsufficientAgents, got {other:?}"),
    }
}

#[tokio::test]
async fn a_refused_worker_claim_fails_the_execution() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store) = build(dir.path());
    orchestrator
        .initialize_session(vec![agent("w-1", "dev"), agent("w-2", "dev")])
        .await;
    store.seed(vec![pending("t1"), pending("t2")]);
    // t2 is taken by someone else before the plan is assembled.
    store.set_status(&TaskId::new("t2"), TaskStatus::Claimed);

    match orchestrator
        .create_parallel_execution(
            &[TaskId::new("t1"), TaskId::new("t2")],
            &ExecutionOptions::default(),
        )
        .await
    {
        Err(OrchestrationError::ClaimConflict { task_id, .. }) => {
            assert_eq!(task_id.as_str(), "t2");
        }
        other => panic!("expected ClaimConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_task_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _) = build(dir.path());
    assert!(matches!(
        orchestrator
            .create_parallel_execution(&[], &ExecutionOptions::default())
            .await,
        Err(OrchestrationError::Validation(_))
    ));
}

#[tokio::test]
async fn close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _) = build(dir.path());
    orchestrator.close();
    orchestrator.close();
    assert_eq!(orchestrator.get_orchestration_statistics().active_locks, 0);
}
