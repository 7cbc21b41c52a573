// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Scheduling Domain Types
//!
//! Entities and value objects for task distribution and coordination
//! monitoring, plus the collaborator ports (`TaskStore`, `AgentRegistry`)
//! this crate consumes but does not implement for production use.

pub mod agent;
pub mod coordination;
pub mod distribution;
pub mod error;
pub mod repository;
pub mod task;

pub use agent::{Agent, AgentConfig, AgentFilter, AgentId};
pub use coordination::{
    Coordination, CoordinationOutcome, CoordinationStatus, CoordinationType, ExecutionId,
    ExecutionOptions, ExecutionPlan, WorkerAssignment,
};
pub use distribution::{
    Assignment, DistributionConfig, DistributionResult, DistributionStrategy, FailedAssignment,
};
pub use error::OrchestrationError;
pub use repository::{AgentRegistry, ClaimOutcome, RepositoryError, TaskStore};
pub use task::{Task, TaskId, TaskPriority, TaskStatus};
