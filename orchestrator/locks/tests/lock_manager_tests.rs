// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the lock manager over the filesystem token store.
//!
//! Covers the coordination contract end to end:
//! - mutual exclusion across independent manager instances (the
//!   cross-process case — only the token file is shared),
//! - ownership enforcement on release,
//! - stale-token reclamation, inline and via the sweeper,
//! - proactive deadlock detection (fail-fast, no blocking),
//! - re-entrant acquisition,
//! - soft-fail mode when the lock directory is unusable.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hive_orchestrator_locks::{
    AccessMode, Conflict, ConflictSeverity, CreateOutcome, LockConfig, LockError, LockId,
    LockManager, LockStore, LockStoreError, LockToken, ResolutionStrategy,
};

fn config(dir: &std::path::Path) -> LockConfig {
    LockConfig {
        lock_dir: dir.to_path_buf(),
        timeout_ms: 30_000,
        max_retries: 3,
        retry_interval_ms: 10,
    }
}

#[tokio::test]
async fn acquire_and_release_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::with_fs_store(config(dir.path()));

    let grant = manager.acquire("/work/plan.md", "agent-a", None).await.unwrap();
    assert!(!grant.reentrant);
    assert_eq!(manager.holder_of("/work/plan.md").as_deref(), Some("agent-a"));

    manager.release("/work/plan.md", "agent-a").await.unwrap();
    assert!(manager.holder_of("/work/plan.md").is_none());
    assert!(manager.active_locks().is_empty());
}

#[tokio::test]
async fn mutual_exclusion_across_manager_instances() {
    // Two managers over one directory model two OS processes: the token
    // file is the only shared state.
    let dir = tempfile::tempdir().unwrap();
    let first = LockManager::with_fs_store(config(dir.path()));
    let second = LockManager::with_fs_store(config(dir.path()));

    first.acquire("/shared/db.json", "agent-a", None).await.unwrap();
    let contended = second.acquire("/shared/db.json", "agent-b", None).await;
    assert!(matches!(contended, Err(LockError::Timeout { retry_count: 3 })));
}

#[tokio::test]
async fn concurrent_acquires_have_a_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.max_retries = 1;
    let first = Arc::new(LockManager::with_fs_store(cfg.clone()));
    let second = Arc::new(LockManager::with_fs_store(cfg));

    let (a, b) = tokio::join!(
        first.acquire("/shared/index.bin", "agent-a", None),
        second.acquire("/shared/index.bin", "agent-b", None),
    );
    assert_eq!(
        u32::from(a.is_ok()) + u32::from(b.is_ok()),
        1,
        "exactly one concurrent acquire may win"
    );
}

#[tokio::test]
async fn release_by_non_holder_is_rejected_and_lock_survives() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::with_fs_store(config(dir.path()));

    manager.acquire("/work/state.yaml", "agent-a", None).await.unwrap();
    match manager.release("/work/state.yaml", "agent-b").await {
        Err(LockError::NotOwner { holder }) => assert_eq!(holder, "agent-a"),
        other => panic!("expected NotOwner, got {other:?}"),
    }
    // Still held by the rightful owner.
    assert_eq!(manager.holder_of("/work/state.yaml").as_deref(), Some("agent-a"));
    manager.release("/work/state.yaml", "agent-a").await.unwrap();
}

#[tokio::test]
async fn release_without_a_lock_is_not_held() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::with_fs_store(config(dir.path()));
    assert!(matches!(
        manager.release("/nothing", "agent-a").await,
        Err(LockError::NotHeld)
    ));
}

#[tokio::test]
async fn stale_lock_is_reclaimable_without_release() {
    let dir = tempfile::tempdir().unwrap();
    let first = LockManager::with_fs_store(config(dir.path()));
    let second = LockManager::with_fs_store(config(dir.path()));

    first.acquire("/work/report.md", "agent-a", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    // agent-b treats anything older than 50ms as abandoned.
    let grant = second
        .acquire("/work/report.md", "agent-b", Some(50))
        .await
        .unwrap();
    assert_eq!(grant.agent_id, "agent-b");
}

#[tokio::test]
async fn sweeper_reclaims_expired_locks() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.timeout_ms = 50;
    let manager = LockManager::with_fs_store(cfg);

    manager.acquire("/work/tmp.out", "agent-a", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(manager.sweep_stale().await, 1);
    assert!(manager.active_locks().is_empty());

    // Slot is genuinely open again.
    manager.acquire("/work/tmp.out", "agent-b", None).await.unwrap();
}

/// Store whose token is permanently stale and whose removals always fail,
/// modeling a shared directory that turned read-only mid-flight.
struct StuckStaleStore {
    token: LockToken,
}

#[async_trait]
impl LockStore for StuckStaleStore {
    async fn try_create(
        &self,
        _id: &LockId,
        _token: &LockToken,
    ) -> Result<CreateOutcome, LockStoreError> {
        Ok(CreateOutcome::Held(self.token.clone()))
    }

    async fn read(&self, _id: &LockId) -> Result<Option<LockToken>, LockStoreError> {
        Ok(Some(self.token.clone()))
    }

    async fn remove(&self, _id: &LockId) -> Result<bool, LockStoreError> {
        Err(LockStoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "token directory is read-only",
        )))
    }

    fn token_path(&self, id: &LockId) -> PathBuf {
        PathBuf::from(format!("/unwritable/{id}.lock"))
    }
}

#[tokio::test]
async fn failed_reclamation_clears_the_wait_edge() {
    let mut token = LockToken::new(LockId::for_resource("/res/wedged"), "crashed-agent");
    token.acquired_at = chrono::Utc::now() - chrono::Duration::milliseconds(120_000);
    let manager = LockManager::new(
        Arc::new(StuckStaleStore { token }),
        LockConfig {
            max_retries: 3,
            retry_interval_ms: 10,
            ..LockConfig::default()
        },
    );

    let result = manager.acquire("/res/wedged", "agent-a", None).await;
    assert!(matches!(result, Err(LockError::Store(_))));

    // The failed acquire must not leave agent-a registered as a pending
    // requester: another agent's advisory would report phantom contention
    // and cycle detection could walk the dead edge.
    let report = manager.detect_conflicts("/res/wedged", "agent-b", AccessMode::Write);
    assert!(!report.has_conflicts, "conflicts reported: {:?}", report.conflicts);
}

#[tokio::test]
async fn background_sweeper_reclaims_expired_locks() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.timeout_ms = 50;
    let manager = Arc::new(LockManager::with_fs_store(cfg));
    manager.spawn_sweeper();

    manager.acquire("/work/background.out", "agent-a", None).await.unwrap();
    assert_eq!(manager.active_locks().len(), 1);

    // Sweep interval is timeout/2 = 25ms; the lock is stale after 50ms.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(manager.active_locks().is_empty());
    manager.close();
}

#[tokio::test]
async fn reacquire_by_holder_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::with_fs_store(config(dir.path()));

    let first = manager.acquire("/work/own.rs", "agent-a", None).await.unwrap();
    let again = manager.acquire("/work/own.rs", "agent-a", None).await.unwrap();
    assert!(again.reentrant);
    assert_eq!(again.lock_id, first.lock_id);
    assert_eq!(again.acquired_at, first.acquired_at);
}

#[tokio::test]
async fn wait_cycle_is_refused_before_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());

    // Keep agent-b retrying long enough for its wait-for edge to be
    // observable while agent-a makes the closing request.
    cfg.max_retries = 200;
    cfg.retry_interval_ms = 20;
    let manager = Arc::new(LockManager::with_fs_store(cfg));

    manager.acquire("/res/one", "agent-a", None).await.unwrap();
    manager.acquire("/res/two", "agent-b", None).await.unwrap();

    let background = Arc::clone(&manager);
    let waiter = tokio::spawn(async move {
        // b waits on a's lock; the edge b -> lock(one) stays registered
        // for the whole retry loop.
        let _ = background.acquire("/res/one", "agent-b", None).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // a -> lock(two) -> b -> lock(one) -> a closes the cycle.
    match manager.acquire("/res/two", "agent-a", None).await {
        Err(LockError::Deadlock { chain }) => {
            assert_eq!(chain.0.first().map(String::as_str), Some("agent-a"));
            assert_eq!(chain.0.last().map(String::as_str), Some("agent-a"));
        }
        other => panic!("expected Deadlock, got {other:?}"),
    }
    waiter.abort();
}

#[tokio::test]
async fn conflict_advisory_reports_holder_and_severity() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::with_fs_store(config(dir.path()));

    let clean = manager.detect_conflicts("/free", "agent-a", AccessMode::Write);
    assert!(!clean.has_conflicts);
    assert_eq!(clean.severity, ConflictSeverity::None);

    manager.acquire("/busy", "agent-b", None).await.unwrap();
    let write = manager.detect_conflicts("/busy", "agent-a", AccessMode::Write);
    assert_eq!(write.severity, ConflictSeverity::High);
    assert_eq!(write.conflicts.len(), 1);

    let read = manager.detect_conflicts("/busy", "agent-a", AccessMode::Read);
    assert_eq!(read.severity, ConflictSeverity::Medium);

    // The holder itself sees no conflict.
    let own = manager.detect_conflicts("/busy", "agent-b", AccessMode::Write);
    assert!(!own.has_conflicts);
}

#[tokio::test]
async fn unusable_lock_directory_degrades_instead_of_crashing() {
    // Point the lock dir below a regular file so create_dir_all must fail.
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut cfg = config(dir.path());
    cfg.lock_dir = blocker.join("locks");
    let manager = LockManager::with_fs_store(cfg);

    match manager.acquire("/anything", "agent-a", None).await {
        Err(LockError::Directory(_)) => {}
        other => panic!("expected Directory error, got {other:?}"),
    }
    // Still degraded on the next call; never panics.
    assert!(manager.acquire("/other", "agent-a", None).await.is_err());
}

#[tokio::test]
async fn released_lock_is_acquirable_by_the_next_waiter() {
    let dir = tempfile::tempdir().unwrap();
    let first = LockManager::with_fs_store(config(dir.path()));
    let second = LockManager::with_fs_store(config(dir.path()));

    first.acquire("/handoff", "agent-a", None).await.unwrap();
    assert!(second.acquire("/handoff", "agent-b", None).await.is_err());

    first.release("/handoff", "agent-a").await.unwrap();
    assert!(second.acquire("/handoff", "agent-b", None).await.is_ok());
}

#[test]
fn resolution_strategies_report_success_and_action() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::with_fs_store(config(dir.path()));
    let conflict = Conflict::HeldByOther {
        resource: "/busy".to_string(),
        holder: "agent-b".to_string(),
    };

    // Abort is the only strategy with complete semantics: the operation
    // does not happen.
    let abort = manager.resolve_conflict(&conflict, ResolutionStrategy::Abort);
    assert!(!abort.success);
    assert_eq!(abort.strategy, ResolutionStrategy::Abort);
    assert!(abort.action.contains("/busy"));

    // The extension-seam strategies succeed with a described action.
    for strategy in [
        ResolutionStrategy::Merge,
        ResolutionStrategy::Queue,
        ResolutionStrategy::Force,
    ] {
        let resolution = manager.resolve_conflict(&conflict, strategy);
        assert!(resolution.success, "{strategy:?} must succeed");
        assert_eq!(resolution.strategy, strategy);
        assert!(resolution.action.contains("/busy"));
    }
}
