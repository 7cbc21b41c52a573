// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure adapters: in-memory collaborator implementations and
//! configuration loading.

pub mod config;
pub mod repositories;

pub use config::OrchestratorConfig;
pub use repositories::{InMemoryAgentRegistry, InMemoryTaskStore};
