// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Wait-For Graph & Deadlock Detection
//!
//! Directed graph from a *waiting* agent to the lock ids it is currently
//! requesting (not yet holding). Edges are added when an acquisition
//! attempt starts and removed when it ends, success or failure.
//!
//! Detection is proactive: [`WaitForGraph::detect_cycle`] runs before an
//! acquire is allowed to block, so the graph stays acyclic and a real
//! deadlock never forms. Traversal is iterative with an explicit visited
//! set and returns an immutable [`DeadlockChain`], so concurrent detection
//! calls share no mutable traversal state.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::lock::LockId;

/// The cycle found by deadlock detection, as an alternating
/// `agent —waits-for→ lock —held-by→ agent …` hop list ending back at the
/// starting agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockChain(pub Vec<String>);

impl std::fmt::Display for DeadlockChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

/// `agent_id → set<lock_id>` of locks the agent is currently requesting.
#[derive(Debug, Default, Clone)]
pub struct WaitForGraph {
    requests: HashMap<String, HashSet<LockId>>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `agent` is now waiting on `lock`.
    pub fn add_edge(&mut self, agent: &str, lock: LockId) {
        self.requests.entry(agent.to_string()).or_default().insert(lock);
    }

    /// Remove the `agent → lock` edge; drops the agent's entry when it has
    /// no remaining requests.
    pub fn remove_edge(&mut self, agent: &str, lock: &LockId) {
        if let Some(set) = self.requests.get_mut(agent) {
            set.remove(lock);
            if set.is_empty() {
                self.requests.remove(agent);
            }
        }
    }

    /// Agents with a pending request for `lock`, excluding `except`.
    pub fn pending_for(&self, lock: &LockId, except: &str) -> Vec<String> {
        let mut pending: Vec<String> = self
            .requests
            .iter()
            .filter(|(agent, locks)| agent.as_str() != except && locks.contains(lock))
            .map(|(agent, _)| agent.clone())
            .collect();
        pending.sort();
        pending
    }

    pub fn requested_by(&self, agent: &str) -> Option<&HashSet<LockId>> {
        self.requests.get(agent)
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    /// Search for a wait cycle that leads back to `start`.
    ///
    /// `holder_of` maps a lock id to its current holder, supplied by the
    /// lock table owner. Iterative DFS: from each agent, follow every
    /// requested lock to its holder. A path that revisits `start` is a
    /// deadlock; the hop list is returned. The visited set guarantees
    /// termination on diamond (non-cyclic) sharing patterns.
    pub fn detect_cycle<F>(&self, start: &str, holder_of: F) -> Option<DeadlockChain>
    where
        F: Fn(&LockId) -> Option<String>,
    {
        // Stack frames carry the path taken so the chain can be reported
        // without mutating shared state.
        let mut stack: Vec<(String, Vec<String>)> = vec![(start.to_string(), vec![start.to_string()])];
        let mut visited: HashSet<String> = HashSet::new();

        while let Some((agent, path)) = stack.pop() {
            if !visited.insert(agent.clone()) {
                continue;
            }

            let Some(requested) = self.requests.get(&agent) else {
                continue;
            };

            for lock in requested {
                let Some(holder) = holder_of(lock) else {
                    // Unheld lock: the requester will win it, no edge.
                    continue;
                };

                let mut hop_path = path.clone();
                hop_path.push(format!("lock:{lock}"));
                hop_path.push(holder.clone());

                if holder == start {
                    return Some(DeadlockChain(hop_path));
                }
                if !visited.contains(&holder) {
                    stack.push((holder, hop_path));
                }
            }
        }
        None
    }
}
