// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve the SQLite database path: `CRY_STATE_DIR`/crystalmath.db >
/// `XDG_STATE_HOME`/crystalmath/crystalmath.db > `~/.local/state/crystalmath/crystalmath.db`.
pub fn store_path() -> PathBuf {
    state_dir().join("crystalmath.db")
}

fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CRY_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("crystalmath");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".local/state/crystalmath")
}

/// Explicit scratch base override, if the operator set one. Falls back to
/// `CRY_SCRATCH_BASE`/`CRY23_SCRDIR`/system temp inside
/// [`cm_core::paths::resolve_scratch_base`].
pub fn scratch_base_override() -> Option<String> {
    std::env::var("CRY_DAEMON_SCRATCH_BASE").ok()
}

/// Scheduling tick interval (default 1s, matching
/// [`cm_engine::queue::DEFAULT_SCHEDULING_INTERVAL`]), configurable via
/// `CRY_SCHEDULING_INTERVAL_MS`.
pub fn scheduling_interval() -> Duration {
    std::env::var("CRY_SCHEDULING_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(cm_engine::queue::DEFAULT_SCHEDULING_INTERVAL)
}

/// Interval the runner-watch task polls in-flight jobs, default 2s.
pub fn poll_interval() -> Duration {
    std::env::var("CRY_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// IPC request read/write timeout, default 30s.
pub fn ipc_timeout() -> Duration {
    std::env::var("CRY_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Maximum framed message size, default [`cm_wire::DEFAULT_MAX_MESSAGE_SIZE`].
pub fn max_message_size() -> usize {
    std::env::var("CRY_MAX_MESSAGE_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(cm_wire::DEFAULT_MAX_MESSAGE_SIZE)
}

/// Graceful shutdown drain timeout, default 5s.
pub fn drain_timeout() -> Duration {
    std::env::var("CRY_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Bound on concurrently in-flight RPC method handlers, shared across all
/// connections, default 32.
pub fn worker_pool_size() -> usize {
    std::env::var("CRY_WORKER_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(32)
}

/// Directory [`crate::templates::FileInputGenerator`] resolves
/// `template_ref` paths against, default `<state_dir>/templates`.
pub fn template_dir() -> PathBuf {
    std::env::var("CRY_TEMPLATE_DIR").map(PathBuf::from).unwrap_or_else(|_| state_dir().join("templates"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
