// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! YAML-backed orchestrator configuration.
//!
//! ```yaml
//! lock:
//!   lock_dir: .hive/locks
//!   timeout_ms: 30000
//! distribution:
//!   max_tasks: 10
//!   strategy: intelligent
//! coordination_timeout_ms: 300000
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use hive_orchestrator_locks::LockConfig;

use crate::domain::distribution::DistributionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub lock: LockConfig,
    pub distribution: DistributionConfig,
    /// Default timeout applied to grouped executions.
    pub coordination_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lock: LockConfig::default(),
            distribution: DistributionConfig::default(),
            coordination_timeout_ms: 300_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}
