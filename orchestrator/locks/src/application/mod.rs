// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lock Manager Application Service
//!
//! Acquire/release API over a [`LockStore`], with:
//!
//! - proactive deadlock detection (wait-for graph cycle check before any
//!   acquisition is allowed to block),
//! - stale-lock reclamation, both inline during acquisition and via a
//!   background sweeper at half the lock timeout,
//! - non-blocking conflict advisory and a pluggable resolution seam,
//! - a permanent soft-fail mode when the token directory is unusable at
//!   startup (every acquire fails with [`LockError::Directory`]; the
//!   process keeps running).
//!
//! The manager exclusively owns the active-lock table and the wait-for
//! graph; no other component mutates them. `acquire` is the only blocking
//! operation, bounded by `max_retries × retry_interval_ms`. There is no
//! fairness guarantee among waiters: the first successful atomic token
//! creation wins, regardless of arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::conflict::{
    AccessMode, Conflict, ConflictReport, Resolution, ResolutionStrategy,
};
use crate::domain::error::LockError;
use crate::domain::lock::{Lock, LockConfig, LockGrant, LockId, LockToken};
use crate::domain::store::{CreateOutcome, LockStore};
use crate::domain::waitgraph::WaitForGraph;
use crate::infrastructure::FsLockStore;

/// Mutable state owned by the manager: the active-lock table and the
/// wait-for graph, guarded together so cycle detection sees a consistent
/// snapshot of holders and waiters.
#[derive(Default)]
struct ManagerState {
    locks: HashMap<LockId, Lock>,
    wait_graph: WaitForGraph,
}

/// Cross-process lock coordination service.
///
/// Constructed explicitly and passed by reference (`Arc`) — never a module
/// singleton. `close()` ends the lifecycle: the background sweeper is
/// aborted and in-memory state dropped.
pub struct LockManager {
    store: Arc<dyn LockStore>,
    config: LockConfig,
    state: Mutex<ManagerState>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    /// Set when the token directory could not be created at startup; the
    /// manager then refuses every acquire instead of crashing the process.
    degraded: Option<String>,
}

impl LockManager {
    /// Build over an arbitrary token store (already known to be usable).
    pub fn new(store: Arc<dyn LockStore>, config: LockConfig) -> Self {
        Self {
            store,
            config,
            state: Mutex::new(ManagerState::default()),
            sweeper: Mutex::new(None),
            degraded: None,
        }
    }

    /// Build over the filesystem store at `config.lock_dir`.
    ///
    /// If the directory cannot be created the manager still constructs,
    /// permanently degraded: every `acquire` returns
    /// [`LockError::Directory`] immediately.
    pub fn with_fs_store(config: LockConfig) -> Self {
        let store = FsLockStore::new(&config.lock_dir);
        let degraded = match store.ensure_dir() {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    dir = %config.lock_dir.display(),
                    error = %e,
                    "lock directory unavailable; manager degraded to soft-fail mode"
                );
                Some(format!("{}: {e}", config.lock_dir.display()))
            }
        };
        Self {
            store: Arc::new(store),
            config,
            state: Mutex::new(ManagerState::default()),
            sweeper: Mutex::new(None),
            degraded,
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquire an exclusive lock on `resource` for `agent`.
    ///
    /// `timeout_ms` overrides the configured staleness threshold for this
    /// call. Re-acquiring a resource the agent already holds is an
    /// idempotent success (`reentrant: true`).
    ///
    /// Fails fast with [`LockError::Deadlock`] when waiting would close a
    /// cycle in the wait-for graph; otherwise retries atomic token creation
    /// up to `max_retries` times, reclaiming stale tokens along the way,
    /// and returns [`LockError::Timeout`] on exhaustion.
    pub async fn acquire(
        &self,
        resource: &str,
        agent: &str,
        timeout_ms: Option<u64>,
    ) -> Result<LockGrant, LockError> {
        if let Some(reason) = &self.degraded {
            return Err(LockError::Directory(reason.clone()));
        }
        let staleness_ms = timeout_ms.unwrap_or(self.config.timeout_ms);
        let id = LockId::for_resource(resource);

        // Re-entrant fast path: the agent already holds this resource.
        {
            let state = self.state.lock();
            if let Some(existing) = state.locks.get(&id) {
                if existing.holder == agent {
                    debug!(resource, agent, "re-entrant acquire; returning existing grant");
                    return Ok(LockGrant {
                        lock_id: id,
                        resource: resource.to_string(),
                        agent_id: agent.to_string(),
                        acquired_at: existing.acquired_at,
                        reentrant: true,
                    });
                }
            }
        }

        // Register the wait-for edge, then check for a cycle before
        // blocking. A detected cycle removes the edge and fails fast.
        {
            let mut state = self.state.lock();
            state.wait_graph.add_edge(agent, id.clone());
            let cycle = {
                let locks = &state.locks;
                state
                    .wait_graph
                    .detect_cycle(agent, |l| locks.get(l).map(|lk| lk.holder.clone()))
            };
            if let Some(chain) = cycle {
                state.wait_graph.remove_edge(agent, &id);
                warn!(resource, agent, %chain, "acquisition refused: wait cycle detected");
                return Err(LockError::Deadlock { chain });
            }
        }

        let mut retry_count = 0;
        while retry_count < self.config.max_retries {
            retry_count += 1;
            let token = LockToken::new(id.clone(), agent);

            match self.store.try_create(&id, &token).await {
                Ok(CreateOutcome::Created) => {
                    let lock = Lock {
                        id: id.clone(),
                        resource: resource.to_string(),
                        holder: agent.to_string(),
                        acquired_at: token.acquired_at,
                        token_path: self.store.token_path(&id),
                    };
                    let mut state = self.state.lock();
                    state.locks.insert(id.clone(), lock);
                    state.wait_graph.remove_edge(agent, &id);
                    info!(resource, agent, lock_id = %id, retry_count, "lock acquired");
                    return Ok(LockGrant {
                        lock_id: id,
                        resource: resource.to_string(),
                        agent_id: agent.to_string(),
                        acquired_at: token.acquired_at,
                        reentrant: false,
                    });
                }
                Ok(CreateOutcome::Held(existing)) => {
                    if existing.is_stale(staleness_ms) {
                        // A failed reclamation must clear the wait edge like
                        // every other exit, or the agent stays registered as
                        // a phantom requester.
                        if let Err(e) = self.reclaim_stale(&id, &existing).await {
                            self.state.lock().wait_graph.remove_edge(agent, &id);
                            return Err(e);
                        }
                        // Retry immediately; the token slot is now open.
                        continue;
                    }
                    tokio::time::sleep(Duration::from_millis(self.config.retry_interval_ms))
                        .await;
                }
                Err(e) => {
                    self.state.lock().wait_graph.remove_edge(agent, &id);
                    return Err(e.into());
                }
            }
        }

        self.state.lock().wait_graph.remove_edge(agent, &id);
        warn!(resource, agent, retry_count, "lock acquisition timed out");
        Err(LockError::Timeout { retry_count })
    }

    /// Release the lock on `resource`.
    ///
    /// Fails with [`LockError::NotHeld`] when no record exists and
    /// [`LockError::NotOwner`] when the recorded holder differs; in the
    /// latter case the lock is left intact.
    pub async fn release(&self, resource: &str, agent: &str) -> Result<(), LockError> {
        let id = LockId::for_resource(resource);
        {
            let state = self.state.lock();
            match state.locks.get(&id) {
                None => return Err(LockError::NotHeld),
                Some(lock) if lock.holder != agent => {
                    return Err(LockError::NotOwner {
                        holder: lock.holder.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        self.store.remove(&id).await?;
        self.state.lock().locks.remove(&id);
        info!(resource, agent, lock_id = %id, "lock released");
        Ok(())
    }

    /// Non-blocking advisory: who else is holding or waiting on `resource`.
    ///
    /// A `Write` intent against any contention classifies High; any
    /// contention at all classifies Medium; otherwise None. Never blocks
    /// on lock contention.
    pub fn detect_conflicts(
        &self,
        resource: &str,
        agent: &str,
        mode: AccessMode,
    ) -> ConflictReport {
        let id = LockId::for_resource(resource);
        let state = self.state.lock();

        let mut conflicts = Vec::new();
        if let Some(lock) = state.locks.get(&id) {
            if lock.holder != agent {
                conflicts.push(Conflict::HeldByOther {
                    resource: resource.to_string(),
                    holder: lock.holder.clone(),
                });
            }
        }
        let pending = state.wait_graph.pending_for(&id, agent);
        if !pending.is_empty() {
            conflicts.push(Conflict::PendingRequests {
                resource: resource.to_string(),
                agents: pending,
            });
        }
        ConflictReport::classify(conflicts, mode)
    }

    /// Choose a handling for a detected conflict.
    ///
    /// `abort` fails the operation outright. `merge`, `queue`, and `force`
    /// succeed with a described action; the concrete machinery is an
    /// extension seam for callers that own the resource semantics.
    pub fn resolve_conflict(&self, conflict: &Conflict, strategy: ResolutionStrategy) -> Resolution {
        let subject = match conflict {
            Conflict::HeldByOther { resource, .. }
            | Conflict::PendingRequests { resource, .. } => resource.clone(),
        };
        match strategy {
            ResolutionStrategy::Abort => Resolution {
                success: false,
                strategy,
                action: format!("operation on '{subject}' aborted; resource left untouched"),
            },
            ResolutionStrategy::Merge => Resolution {
                success: true,
                strategy,
                action: format!("reconcile both change sets for '{subject}' before release"),
            },
            ResolutionStrategy::Queue => Resolution {
                success: true,
                strategy,
                action: format!("wait for the current holder of '{subject}' and retry"),
            },
            ResolutionStrategy::Force => Resolution {
                success: true,
                strategy,
                action: format!("seize '{subject}'; the current holder's token will be replaced"),
            },
        }
    }

    /// Remove every tracked lock whose age exceeds the configured timeout.
    /// Returns how many were reclaimed.
    pub async fn sweep_stale(&self) -> usize {
        let stale: Vec<(LockId, String)> = {
            let state = self.state.lock();
            state
                .locks
                .values()
                .filter(|l| l.age_ms() > self.config.timeout_ms as i64)
                .map(|l| (l.id.clone(), l.holder.clone()))
                .collect()
        };

        let mut reclaimed = 0;
        for (id, holder) in stale {
            if let Err(e) = self.store.remove(&id).await {
                warn!(lock_id = %id, error = %e, "failed to remove stale lock token");
                continue;
            }
            self.state.lock().locks.remove(&id);
            warn!(lock_id = %id, holder, "stale lock swept");
            reclaimed += 1;
        }
        reclaimed
    }

    /// Start the background sweeper at half the lock timeout.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let period = Duration::from_millis((self.config.timeout_ms / 2).max(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                let swept = manager.sweep_stale().await;
                if swept > 0 {
                    info!(swept, "stale lock sweep completed");
                }
            }
        });
        *self.sweeper.lock() = Some(handle);
    }

    /// End of lifecycle: stop the sweeper and drop in-memory state. Token
    /// files for still-held locks are left for staleness reclamation by
    /// other processes.
    pub fn close(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        let mut state = self.state.lock();
        state.locks.clear();
        state.wait_graph.clear();
    }

    /// Snapshot of the active-lock table.
    pub fn active_locks(&self) -> Vec<Lock> {
        self.state.lock().locks.values().cloned().collect()
    }

    /// Current holder of `resource`, if this manager tracks one.
    pub fn holder_of(&self, resource: &str) -> Option<String> {
        let id = LockId::for_resource(resource);
        self.state.lock().locks.get(&id).map(|l| l.holder.clone())
    }

    /// Stale-token reclamation during acquisition. Re-reads the token and
    /// only unlinks when it is still the one observed stale, narrowing the
    /// window in which a freshly-created replacement could be removed.
    async fn reclaim_stale(&self, id: &LockId, observed: &LockToken) -> Result<(), LockError> {
        if let Some(current) = self.store.read(id).await? {
            if current.acquired_at == observed.acquired_at {
                warn!(
                    lock_id = %id,
                    holder = %observed.agent_id,
                    age_ms = observed.age_ms(),
                    "reclaiming stale lock"
                );
                self.store.remove(id).await?;
                self.state.lock().locks.remove(id);
            }
        }
        Ok(())
    }
}

impl Drop for LockManager {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}
