// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Entity (scheduler view)
//!
//! The distribution engine's read model of an agent: role, skills, and a
//! workload counter against a concurrency cap. The system of record is the
//! external [`AgentRegistry`]; during a single distribution pass the
//! distributor tracks workload increments on its local copies — a
//! documented consistency shortcut, reconciled through
//! [`AgentRegistry::update_workload`].
//!
//! [`AgentRegistry`]: crate::domain::repository::AgentRegistry
//! [`AgentRegistry::update_workload`]: crate::domain::repository::AgentRegistry::update_workload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An agent as the scheduler sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    /// Role matched against a task's mode (case-insensitive on the task
    /// side), e.g. `dev`, `review`, `research`.
    pub role: String,
    pub specializations: Vec<String>,
    pub capabilities: Vec<String>,
    /// Tasks currently claimed by this agent.
    pub workload: u32,
    pub max_concurrent_tasks: u32,
    pub registered_at: DateTime<Utc>,
}

impl Agent {
    pub fn from_config(config: AgentConfig) -> Self {
        Self {
            id: AgentId::new(),
            name: config.name,
            role: config.role,
            specializations: config.specializations,
            capabilities: config.capabilities,
            workload: 0,
            max_concurrent_tasks: config.max_concurrent_tasks,
            registered_at: Utc::now(),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.workload < self.max_concurrent_tasks
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Registration input for [`AgentRegistry::register`].
///
/// [`AgentRegistry::register`]: crate::domain::repository::AgentRegistry::register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: u32,
}

fn default_max_concurrent() -> u32 {
    3
}

/// Filter passed to [`AgentRegistry::active_agents`].
///
/// [`AgentRegistry::active_agents`]: crate::domain::repository::AgentRegistry::active_agents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentFilter {
    /// Restrict to a role.
    pub role: Option<String>,
    /// Only agents with spare capacity.
    #[serde(default)]
    pub with_capacity: bool,
}
