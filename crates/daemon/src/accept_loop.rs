// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accept loop for the daemon's Unix-domain socket.
//!
//! One task here, one task per accepted connection in [`crate::connection`].
//! No TCP fallback and no handshake: the socket's filesystem permissions
//! (`0600`, see [`crate::socket`]) are the only access control this system
//! needs for a workstation-resident daemon.

use std::sync::Arc;

use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::connection;
use crate::runtime::Runtime;

pub async fn run(listener: UnixListener, runtime: Arc<Runtime>) {
    info!("accepting connections");
    loop {
        tokio::select! {
            _ = runtime.shutdown.cancelled() => {
                info!("listener shutting down");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let runtime = Arc::clone(&runtime);
                        tokio::spawn(async move {
                            connection::handle(stream, runtime).await;
                        });
                    }
                    Err(err) => warn!(%err, "failed to accept connection"),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "accept_loop_tests.rs"]
mod tests;
