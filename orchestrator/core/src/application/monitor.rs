// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Coordination Monitor Application Service
//!
//! Polled tracker for groups of tasks executing together. Each call to
//! [`CoordinationMonitor::monitor`] advances every active coordination:
//!
//! 1. `elapsed > timeout_ms` → `Timeout`, regardless of task state.
//! 2. Every task `Completed` → `Completed`.
//! 3. Any task `Blocked`/`Failed` → `Failed` (with failure count).
//! 4. Otherwise the group stays `Active`.
//!
//! Terminal transitions record a [`CoordinationOutcome`] and stop tracking
//! the group as active. There is no automatic retry or compensation;
//! recovery policy is an extension point for callers reading the outcome.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::coordination::{
    Coordination, CoordinationOutcome, CoordinationStatus, CoordinationType, ExecutionId,
};
use crate::domain::error::OrchestrationError;
use crate::domain::repository::TaskStore;
use crate::domain::task::TaskStatus;

/// Per-coordination row in a monitoring summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationDetail {
    pub execution_id: ExecutionId,
    pub kind: CoordinationType,
    pub status: CoordinationStatus,
    pub progress_percent: u32,
    pub elapsed_ms: i64,
    pub completed_tasks: usize,
    pub stuck_tasks: usize,
    pub total_tasks: usize,
}

/// Aggregate view returned by [`CoordinationMonitor::monitor`].
///
/// `completed` / `failed` / `timed_out` are cumulative across the
/// monitor's lifetime; `active` is the current count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub details: Vec<CoordinationDetail>,
}

/// Owns every tracked [`Coordination`] and its terminal outcome. The only
/// component that mutates coordination records.
pub struct CoordinationMonitor {
    tasks: Arc<dyn TaskStore>,
    active: Mutex<HashMap<ExecutionId, Coordination>>,
    outcomes: Mutex<HashMap<ExecutionId, CoordinationOutcome>>,
}

impl CoordinationMonitor {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self {
            tasks,
            active: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// Begin tracking a coordination (registered with `status: Active`).
    pub fn track(&self, coordination: Coordination) {
        info!(
            execution_id = %coordination.execution_id,
            kind = ?coordination.kind,
            tasks = coordination.task_ids.len(),
            "coordination registered"
        );
        self.active
            .lock()
            .insert(coordination.execution_id, coordination);
    }

    /// Advance every active coordination one step and summarize.
    pub async fn monitor(&self) -> Result<MonitorSummary, OrchestrationError> {
        let snapshot: Vec<Coordination> = self.active.lock().values().cloned().collect();
        let now = Utc::now();
        let mut details = Vec::with_capacity(snapshot.len());

        for coordination in snapshot {
            let total = coordination.task_ids.len();
            let elapsed_ms = coordination.elapsed_ms(now);

            // Best-effort status census; an unreadable task is counted as
            // still in flight rather than failing the whole sweep.
            let statuses = futures::future::join_all(
                coordination
                    .task_ids
                    .iter()
                    .map(|task_id| self.tasks.task_status(task_id)),
            )
            .await;
            let mut completed = 0;
            let mut stuck = 0;
            for (task_id, status) in coordination.task_ids.iter().zip(statuses) {
                match status {
                    Ok(Some(status)) if status == TaskStatus::Completed => completed += 1,
                    Ok(Some(status)) if status.is_stuck() => stuck += 1,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            execution_id = %coordination.execution_id,
                            task_id = %task_id,
                            error = %e,
                            "task status query failed during monitoring"
                        );
                    }
                }
            }

            // Timeout wins over task state.
            let status = if coordination.is_timed_out(now) {
                CoordinationStatus::Timeout
            } else if completed == total {
                CoordinationStatus::Completed
            } else if stuck > 0 {
                CoordinationStatus::Failed
            } else {
                CoordinationStatus::Active
            };

            if status.is_terminal() {
                self.finalize(&coordination, status, completed, stuck, total);
            }

            let progress_percent = if total == 0 {
                100
            } else {
                (completed * 100 / total) as u32
            };
            details.push(CoordinationDetail {
                execution_id: coordination.execution_id,
                kind: coordination.kind,
                status,
                progress_percent,
                elapsed_ms,
                completed_tasks: completed,
                stuck_tasks: stuck,
                total_tasks: total,
            });
        }

        let (completed, failed, timed_out) = self.outcome_tallies();
        Ok(MonitorSummary {
            active: self.active.lock().len(),
            completed,
            failed,
            timed_out,
            details,
        })
    }

    /// Terminal outcome of a coordination, once it has left `Active`.
    pub fn outcome_of(&self, execution_id: ExecutionId) -> Option<CoordinationOutcome> {
        self.outcomes.lock().get(&execution_id).cloned()
    }

    /// `(active, completed, failed, timed_out)` counts for statistics.
    pub fn statistics(&self) -> (usize, usize, usize, usize) {
        let (completed, failed, timed_out) = self.outcome_tallies();
        (self.active.lock().len(), completed, failed, timed_out)
    }

    fn outcome_tallies(&self) -> (usize, usize, usize) {
        let outcomes = self.outcomes.lock();
        let mut completed = 0;
        let mut failed = 0;
        let mut timed_out = 0;
        for outcome in outcomes.values() {
            match outcome.status {
                CoordinationStatus::Completed => completed += 1,
                CoordinationStatus::Failed => failed += 1,
                CoordinationStatus::Timeout => timed_out += 1,
                CoordinationStatus::Active => {}
            }
        }
        (completed, failed, timed_out)
    }

    fn finalize(
        &self,
        coordination: &Coordination,
        status: CoordinationStatus,
        completed: usize,
        stuck: usize,
        total: usize,
    ) {
        let message = match status {
            CoordinationStatus::Completed => format!("all {total} tasks completed"),
            CoordinationStatus::Failed => format!("{stuck} of {total} tasks blocked or failed"),
            CoordinationStatus::Timeout => format!(
                "timed out after {}ms (limit {}ms)",
                coordination.elapsed_ms(Utc::now()),
                coordination.timeout_ms
            ),
            CoordinationStatus::Active => return,
        };
        info!(
            execution_id = %coordination.execution_id,
            ?status,
            completed,
            stuck,
            total,
            "coordination finalized"
        );
        self.outcomes.lock().insert(
            coordination.execution_id,
            CoordinationOutcome {
                execution_id: coordination.execution_id,
                status,
                completed_tasks: completed,
                failed_tasks: stuck,
                total_tasks: total,
                message,
                recorded_at: Utc::now(),
            },
        );
        self.active.lock().remove(&coordination.execution_id);
    }
}
