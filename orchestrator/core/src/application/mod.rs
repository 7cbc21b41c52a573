// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application services: distribution passes, coordination monitoring, and
//! the orchestrator facade.

pub mod distributor;
pub mod monitor;
pub mod orchestrator;

pub use distributor::TaskDistributor;
pub use monitor::{CoordinationDetail, CoordinationMonitor, MonitorSummary};
pub use orchestrator::{
    FailedRegistration, OrchestrationStatistics, Orchestrator, ParallelExecution, SessionReport,
};
