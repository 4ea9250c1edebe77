// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess runner: spawns `crystalOMP`/`PcrystalOMP` directly on this
//! workstation.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use cm_core::{Job, ParallelismMode, RemoteHandle};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LogStream, Runner, RunnerStatus};

/// Ring buffer size for captured stdout/stderr lines, per job.
const LOG_BUFFER_LINES: usize = 10_000;

struct LocalJob {
    status: Mutex<RunnerStatus>,
    logs: Mutex<VecDeque<String>>,
    work_dir: std::path::PathBuf,
}

impl LocalJob {
    fn push_log(&self, line: String) {
        let mut logs = self.logs.lock();
        if logs.len() == LOG_BUFFER_LINES {
            logs.pop_front();
        }
        logs.push_back(line);
    }
}

/// Spawns CRYSTAL23 as a local subprocess. Stdout/stderr are captured
/// line-by-line into a bounded ring buffer per job, consumed by
/// `stream_logs`.
#[derive(Default)]
pub struct LocalRunner {
    jobs: Arc<Mutex<HashMap<u32, Arc<LocalJob>>>>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn command_for(job: &Job) -> Command {
        let parallelism = job.parallelism.unwrap_or_default();
        let mut cmd = match parallelism.mode {
            ParallelismMode::Serial => Command::new("crystalOMP"),
            ParallelismMode::Mpi | ParallelismMode::Hybrid => {
                let mut cmd = Command::new("mpirun");
                cmd.arg("-np").arg(parallelism.ranks.max(1).to_string()).arg("PcrystalOMP");
                cmd
            }
        };
        cmd.env("OMP_NUM_THREADS", parallelism.threads.max(1).to_string());
        if matches!(parallelism.mode, ParallelismMode::Hybrid) {
            cmd.env("OMP_STACKSIZE", "256M")
                .env("I_MPI_PIN_DOMAIN", "omp")
                .env("KMP_AFFINITY", "compact,1,0,granularity=fine");
        }
        cmd.current_dir(&job.work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Runner for LocalRunner {
    async fn submit(&self, job: &Job, prepared_input: &str) -> RunnerResult<RemoteHandle> {
        let mut cmd = Self::command_for(job);
        let mut child = cmd.spawn().map_err(|e| RunnerError::Spawn(e.to_string()))?;
        let pid = child.id().ok_or_else(|| RunnerError::Spawn("process exited before pid was assigned".into()))?;

        let mut stdin = child.stdin.take().ok_or_else(|| RunnerError::Spawn("no stdin handle".into()))?;
        let input = prepared_input.to_string();
        tokio::spawn(async move {
            let _ = stdin.write_all(input.as_bytes()).await;
        });

        let local_job = Arc::new(LocalJob {
            status: Mutex::new(RunnerStatus::Running),
            logs: Mutex::new(VecDeque::with_capacity(LOG_BUFFER_LINES)),
            work_dir: job.work_dir.clone(),
        });
        self.jobs.lock().insert(pid, local_job.clone());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stream_job = local_job.clone();
        tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    stream_job.push_log(line);
                }
            }
        });
        let stream_job = local_job.clone();
        tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    stream_job.push_log(line);
                }
            }
        });

        tokio::spawn(async move {
            let resolved = match child.wait().await {
                Ok(status) => {
                    let end_time_ms = now_ms();
                    let exit_code = status.code().unwrap_or(-1);
                    if exit_code == 0 {
                        RunnerStatus::Completed { exit_code, end_time_ms }
                    } else {
                        RunnerStatus::Failed { reason: format!("exited with status {exit_code}") }
                    }
                }
                Err(e) => {
                    tracing::warn!(pid, error = %e, "failed to wait on local job process");
                    RunnerStatus::Failed { reason: format!("wait() failed: {e}") }
                }
            };
            *local_job.status.lock() = resolved;
        });

        Ok(RemoteHandle::Pid(pid))
    }

    async fn poll(&self, handle: &RemoteHandle) -> RunnerResult<RunnerStatus> {
        let pid = pid_from_handle(handle)?;
        let jobs = self.jobs.lock();
        let job = jobs.get(&pid).ok_or_else(|| RunnerError::UnknownHandle(handle.to_string()))?;
        Ok(job.status.lock().clone())
    }

    async fn cancel(&self, handle: &RemoteHandle) -> RunnerResult<bool> {
        let pid = pid_from_handle(handle)?;
        let jobs = self.jobs.lock();
        let job = jobs.get(&pid).ok_or_else(|| RunnerError::UnknownHandle(handle.to_string()))?;
        let mut status = job.status.lock();
        if status.is_terminal() {
            return Ok(false);
        }
        #[cfg(unix)]
        {
            let _ = tokio::process::Command::new("kill").arg("-TERM").arg(pid.to_string()).status().await;
        }
        *status = RunnerStatus::Cancelled;
        Ok(true)
    }

    async fn retrieve(&self, handle: &RemoteHandle, dest_dir: &Path) -> RunnerResult<()> {
        let pid = pid_from_handle(handle)?;
        let jobs = self.jobs.lock();
        let job = jobs.get(&pid).ok_or_else(|| RunnerError::UnknownHandle(handle.to_string()))?;
        let work_dir = job.work_dir.clone();
        drop(jobs);
        if work_dir == dest_dir {
            return Ok(());
        }
        std::fs::create_dir_all(dest_dir)?;
        for entry in std::fs::read_dir(&work_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                std::fs::copy(entry.path(), dest_dir.join(entry.file_name()))?;
            }
        }
        Ok(())
    }

    async fn stream_logs(&self, handle: &RemoteHandle) -> RunnerResult<LogStream> {
        let pid = pid_from_handle(handle)?;
        let jobs = self.jobs.lock();
        let job = jobs.get(&pid).ok_or_else(|| RunnerError::UnknownHandle(handle.to_string()))?.clone();
        drop(jobs);
        let (tx, rx) = mpsc::channel(LOG_BUFFER_LINES.min(256));
        tokio::spawn(async move {
            let lines: Vec<String> = job.logs.lock().iter().cloned().collect();
            for line in lines {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

fn pid_from_handle(handle: &RemoteHandle) -> RunnerResult<u32> {
    match handle {
        RemoteHandle::Pid(pid) => Ok(*pid),
        RemoteHandle::SlurmJobId(_) => Err(RunnerError::UnknownHandle(handle.to_string())),
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
