// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform [`Runner`] contract implemented by the local, SSH, and SLURM
//! execution backends.

use std::path::Path;

use async_trait::async_trait;
use cm_core::{Job, RemoteHandle};
use tokio::sync::mpsc;

use crate::error::RunnerResult;

/// Non-blocking status of a dispatched job, as observed by `poll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerStatus {
    Queued,
    Running,
    Completed { exit_code: i32, end_time_ms: u64 },
    Failed { reason: String },
    Cancelled,
}

impl RunnerStatus {
    /// Terminal statuses: `Completed`, `Failed`, `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerStatus::Completed { .. } | RunnerStatus::Failed { .. } | RunnerStatus::Cancelled)
    }
}

/// A finite, not-restartable sequence of log lines. Dropping the receiver
/// before it is drained simply stops the producer task's next send.
pub type LogStream = mpsc::Receiver<String>;

/// Execution backend capable of running a prepared job and reporting on it.
///
/// Implemented by [`crate::local::LocalRunner`], [`crate::ssh::SshRunner`],
/// and [`crate::slurm::SlurmRunner`]. The Queue Manager only ever talks to
/// a `dyn Runner`; it never downcasts or matches on the concrete variant.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Prepare and launch `job`. `prepared_input` is the rendered input
    /// file contents; the returned handle identifies the run for every
    /// later call.
    async fn submit(&self, job: &Job, prepared_input: &str) -> RunnerResult<RemoteHandle>;

    /// Non-blocking status check.
    async fn poll(&self, handle: &RemoteHandle) -> RunnerResult<RunnerStatus>;

    /// Best-effort cancellation. Returns `true` if a running job was
    /// signalled; `false` if it had already reached a terminal status.
    async fn cancel(&self, handle: &RemoteHandle) -> RunnerResult<bool>;

    /// Copy artifacts from the job's work directory into `dest_dir`.
    async fn retrieve(&self, handle: &RemoteHandle, dest_dir: &Path) -> RunnerResult<()>;

    /// Stream captured stdout/stderr lines for the run. The stream ends
    /// once the captured buffer is exhausted; it is not restartable.
    async fn stream_logs(&self, handle: &RemoteHandle) -> RunnerResult<LogStream>;
}
