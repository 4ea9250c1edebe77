// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binds the daemon's Unix-domain listening socket.
//!
//! Unlike the teacher's `fs2`-based exclusive lock file, mutual exclusion
//! here is a connect probe against the socket path itself: if a connection
//! succeeds, another daemon already owns it and startup fails; if it fails
//! with "connection refused" or "not found", the path is a stale leftover
//! from an unclean shutdown and is removed before binding fresh.

use std::io;
use std::path::{Path, PathBuf};

use tokio::net::{UnixListener, UnixStream};

/// Resolve the path the daemon should bind, using the current process's uid.
pub fn resolve_path() -> PathBuf {
    let uid = nix::unistd::getuid().as_raw();
    cm_core::paths::resolve_socket_path(uid)
}

/// Probe `path`, clear it if stale, and bind a fresh listener with mode
/// `0600`.
pub async fn bind(path: &Path) -> io::Result<UnixListener> {
    probe_and_clear(path).await?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(path)?;
    set_owner_only_permissions(path)?;
    Ok(listener)
}

async fn probe_and_clear(path: &Path) -> io::Result<()> {
    match UnixStream::connect(path).await {
        Ok(_) => Err(io::Error::new(io::ErrorKind::AddrInUse, format!("socket already in use: {}", path.display()))),
        Err(err) if matches!(err.kind(), io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound) => {
            let _ = std::fs::remove_file(path);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn set_owner_only_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
