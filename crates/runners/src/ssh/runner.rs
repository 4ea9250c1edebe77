// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner backed by a pooled SSH session: creates a remote work directory,
//! uploads the prepared input, launches a background shell driver, and
//! polls it via `kill -0` + an exit-code file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cm_core::{Cluster, ClusterId, Job, RemoteHandle};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::pool::ConnectionPool;
use super::quoting::quote;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LogStream, Runner, RunnerStatus};

const DEFAULT_REMOTE_SCRATCH_BASE: &str = "/tmp";

/// Resolves a cluster id to its full record. The SSH runner is given one
/// at construction time rather than owning the Store itself.
pub trait ClusterLookup: Send + Sync {
    fn get(&self, cluster_id: ClusterId) -> Option<Cluster>;
}

struct RemoteJobEntry {
    cluster: Cluster,
    remote_work_dir: String,
    status: Mutex<RunnerStatus>,
}

pub struct SshRunner {
    pool: Arc<ConnectionPool>,
    clusters: Arc<dyn ClusterLookup>,
    jobs: Mutex<HashMap<u32, Arc<RemoteJobEntry>>>,
}

impl SshRunner {
    pub fn new(pool: Arc<ConnectionPool>, clusters: Arc<dyn ClusterLookup>) -> Self {
        Self { pool, clusters, jobs: Mutex::new(HashMap::new()) }
    }

    fn scratch_base(cluster: &Cluster) -> String {
        cluster
            .connection_config
            .get("remote_scratch_base")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_REMOTE_SCRATCH_BASE)
            .to_string()
    }

    fn cluster_for(&self, job: &Job) -> RunnerResult<Cluster> {
        let cluster_id = job.cluster_id.ok_or_else(|| RunnerError::InvalidInput("job has no cluster_id".into()))?;
        self.clusters.get(cluster_id).ok_or_else(|| RunnerError::InvalidInput(format!("unknown cluster {cluster_id}")))
    }
}

#[async_trait]
impl Runner for SshRunner {
    async fn submit(&self, job: &Job, prepared_input: &str) -> RunnerResult<RemoteHandle> {
        let cluster = self.cluster_for(job)?;
        let remote_work_dir = format!("{}/cm-job-{}", Self::scratch_base(&cluster), job.id);

        self.pool.exec(&cluster, &format!("mkdir -p {}", quote(&remote_work_dir))).await?;

        let input_path = format!("{remote_work_dir}/input");
        self.pool.write_file(&cluster, &input_path, prepared_input.as_bytes()).await?;

        let driver_path = format!("{remote_work_dir}/driver.sh");
        let stdout_path = format!("{remote_work_dir}/stdout.log");
        let stderr_path = format!("{remote_work_dir}/stderr.log");
        let exit_code_path = format!("{remote_work_dir}/exit_code");
        let driver = format!(
            "#!/bin/sh\ncd {workdir} && crystalOMP < {input} > {stdout} 2> {stderr}\necho $? > {exit_code}\n",
            workdir = quote(&remote_work_dir),
            input = quote(&input_path),
            stdout = quote(&stdout_path),
            stderr = quote(&stderr_path),
            exit_code = quote(&exit_code_path),
        );
        self.pool.write_file(&cluster, &driver_path, driver.as_bytes()).await?;

        let launch = format!("nohup sh {} > /dev/null 2>&1 & echo $!", quote(&driver_path));
        let (status, output) = self.pool.exec(&cluster, &launch).await?;
        if status != 0 {
            return Err(RunnerError::Transport(format!("failed to launch driver on {}", cluster.host)));
        }
        let pid: u32 = output
            .trim()
            .parse()
            .map_err(|_| RunnerError::Transport(format!("could not parse remote pid from {output:?}")))?;

        self.jobs.lock().insert(
            pid,
            Arc::new(RemoteJobEntry { cluster, remote_work_dir, status: Mutex::new(RunnerStatus::Running) }),
        );
        Ok(RemoteHandle::Pid(pid))
    }

    async fn poll(&self, handle: &RemoteHandle) -> RunnerResult<RunnerStatus> {
        let pid = pid_from_handle(handle)?;
        let entry = self.entry(pid)?;
        {
            let status = entry.status.lock();
            if status.is_terminal() {
                return Ok(status.clone());
            }
        }

        let (alive_status, _) = self.pool.exec(&entry.cluster, &format!("kill -0 {pid} 2>/dev/null")).await?;
        if alive_status == 0 {
            return Ok(RunnerStatus::Running);
        }

        let exit_code_path = format!("{}/exit_code", entry.remote_work_dir);
        let (_, contents) = self.pool.exec(&entry.cluster, &format!("cat {} 2>/dev/null", quote(&exit_code_path))).await?;
        let resolved = match contents.trim().parse::<i32>() {
            Ok(0) => RunnerStatus::Completed { exit_code: 0, end_time_ms: now_ms() },
            Ok(code) => RunnerStatus::Failed { reason: format!("exited with status {code}") },
            Err(_) => RunnerStatus::Failed { reason: "process exited without writing an exit code".into() },
        };
        *entry.status.lock() = resolved.clone();
        Ok(resolved)
    }

    async fn cancel(&self, handle: &RemoteHandle) -> RunnerResult<bool> {
        let pid = pid_from_handle(handle)?;
        let entry = self.entry(pid)?;
        let mut status = entry.status.lock();
        if status.is_terminal() {
            return Ok(false);
        }
        self.pool.exec(&entry.cluster, &format!("kill -TERM {pid} 2>/dev/null")).await?;
        *status = RunnerStatus::Cancelled;
        Ok(true)
    }

    async fn retrieve(&self, handle: &RemoteHandle, dest_dir: &Path) -> RunnerResult<()> {
        let pid = pid_from_handle(handle)?;
        let entry = self.entry(pid)?;
        std::fs::create_dir_all(dest_dir)?;

        let (_, listing) =
            self.pool.exec(&entry.cluster, &format!("ls -1 {}", quote(&entry.remote_work_dir))).await?;
        for name in listing.lines().filter(|l| !l.is_empty()) {
            let remote_path = format!("{}/{}", entry.remote_work_dir, name);
            let bytes = self.pool.read_file(&entry.cluster, &remote_path).await?;
            std::fs::write(dest_dir.join(name), bytes)?;
        }
        Ok(())
    }

    async fn stream_logs(&self, handle: &RemoteHandle) -> RunnerResult<LogStream> {
        let pid = pid_from_handle(handle)?;
        let entry = self.entry(pid)?;
        let stdout_path = format!("{}/stdout.log", entry.remote_work_dir);
        let bytes = self.pool.read_file(&entry.cluster, &stdout_path).await.unwrap_or_default();

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            for line in String::from_utf8_lossy(&bytes).lines() {
                if tx.send(line.to_string()).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

impl SshRunner {
    fn entry(&self, pid: u32) -> RunnerResult<Arc<RemoteJobEntry>> {
        self.jobs.lock().get(&pid).cloned().ok_or_else(|| RunnerError::UnknownHandle(pid.to_string()))
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
#[path = "runner_tests.rs"]
mod tests;
