// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cm-storage: the durable record of jobs, clusters, workflows, queue
//! state, and scheduler metrics. The only crate allowed to touch the
//! SQLite file; every other crate goes through [`Store`].

pub mod error;
pub mod migrations;

mod clusters;
mod dependencies;
mod jobs;
mod metrics;
mod queue_state;
mod remote_jobs;
mod workflows;

pub use error::{StoreError, StoreResult};

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Busy-retry window before a writer gives up on a locked database.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Durable store, backed by a single SQLite connection behind a mutex.
///
/// A single connection (rather than a pool) is the serialization point:
/// SQLite allows one writer at a time regardless, and `parking_lot::Mutex`
/// avoids the overhead of a pool for a workload that is never
/// lock-contended for long (every call here is a handful of indexed
/// lookups or a short transaction).
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the database at `path` and bring its
    /// schema up to [`migrations::CURRENT_SCHEMA_VERSION`].
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// An in-memory store, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn configure(conn: &Connection) -> StoreResult<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
