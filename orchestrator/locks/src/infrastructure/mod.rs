// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure adapters for the lock coordination crate.

pub mod fs_store;

pub use fs_store::FsLockStore;
