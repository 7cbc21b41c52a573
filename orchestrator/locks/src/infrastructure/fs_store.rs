// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Filesystem Lock Token Store
//!
//! Tokens are JSON files at `<dir>/<lock_id>.lock`. Creation uses
//! `O_CREAT|O_EXCL` (`OpenOptions::create_new`), the filesystem's atomic
//! single-winner primitive: of any number of concurrent creators, exactly
//! one opens the file and every other gets `AlreadyExists`. No central
//! server — any process that can see the directory participates in the
//! protocol.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::error::LockStoreError;
use crate::domain::lock::{LockId, LockToken};
use crate::domain::store::{CreateOutcome, LockStore};

/// Token store over a shared directory.
#[derive(Debug, Clone)]
pub struct FsLockStore {
    dir: PathBuf,
}

impl FsLockStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the token directory. Failure puts the owning manager into
    /// soft-fail mode; it is not fatal to the process.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_token_file(path: &Path) -> Option<LockToken> {
        // The holder may release (unlink) between our existence check and
        // the read; a missing or truncated token means "not held".
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[async_trait]
impl LockStore for FsLockStore {
    async fn try_create(
        &self,
        id: &LockId,
        token: &LockToken,
    ) -> Result<CreateOutcome, LockStoreError> {
        let path = self.token_path(id);
        let payload = serde_json::to_vec_pretty(token)?;

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                file.write_all(&payload).map_err(LockStoreError::Io)?;
                file.sync_all().map_err(LockStoreError::Io)?;
                debug!(lock_id = %id, path = %path.display(), "lock token created");
                Ok(CreateOutcome::Created)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match Self::read_token_file(&path) {
                    Some(existing) => Ok(CreateOutcome::Held(existing)),
                    // Token vanished or is mid-write; report as held with a
                    // synthetic fresh token so the caller backs off and
                    // retries rather than spinning on a parse error.
                    None => Ok(CreateOutcome::Held(LockToken::new(
                        id.clone(),
                        "unknown",
                    ))),
                }
            }
            Err(e) => Err(LockStoreError::Io(e)),
        }
    }

    async fn read(&self, id: &LockId) -> Result<Option<LockToken>, LockStoreError> {
        Ok(Self::read_token_file(&self.token_path(id)))
    }

    async fn remove(&self, id: &LockId) -> Result<bool, LockStoreError> {
        let path = self.token_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(lock_id = %id, "lock token removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LockStoreError::Io(e)),
        }
    }

    fn token_path(&self, id: &LockId) -> PathBuf {
        self.dir.join(format!("{id}.lock"))
    }
}
