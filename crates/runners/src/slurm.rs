// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner backed by SLURM's batch scheduler: generates an `sbatch` script,
//! submits it over the shared SSH connection pool, and polls `squeue`/
//! `sacct` for its state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use cm_core::{Cluster, Job, RemoteHandle};
use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::mpsc;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LogStream, Runner, RunnerStatus};
use crate::ssh::{ClusterLookup, ConnectionPool};

/// Conservative allow-list for SLURM directive values interpolated into
/// the batch script: partitions, accounts, QoS, module names.
fn allow_list() -> &'static Regex {
    static ALLOW_LIST: OnceLock<Regex> = OnceLock::new();
    ALLOW_LIST.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("static regex"))
}

fn validate(field: &str, value: &str) -> RunnerResult<()> {
    if allow_list().is_match(value) {
        Ok(())
    } else {
        Err(RunnerError::InvalidInput(format!("{field} {value:?} fails allow-list validation")))
    }
}

struct RemoteJobEntry {
    cluster: Cluster,
    status: Mutex<RunnerStatus>,
}

/// SLURM-specific batch directives, read from the cluster's
/// `connection_config` (queue-opaque to everyone but this runner).
#[derive(Debug, Default, serde::Deserialize)]
struct SlurmDefaults {
    #[serde(default)]
    partition: Option<String>,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    qos: Option<String>,
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default = "default_remote_scratch_base")]
    remote_scratch_base: String,
}

fn default_remote_scratch_base() -> String {
    "/tmp".to_string()
}

pub struct SlurmRunner {
    pool: Arc<ConnectionPool>,
    clusters: Arc<dyn ClusterLookup>,
    jobs: Mutex<HashMap<String, Arc<RemoteJobEntry>>>,
}

impl SlurmRunner {
    pub fn new(pool: Arc<ConnectionPool>, clusters: Arc<dyn ClusterLookup>) -> Self {
        Self { pool, clusters, jobs: Mutex::new(HashMap::new()) }
    }

    fn cluster_for(&self, job: &Job) -> RunnerResult<Cluster> {
        let cluster_id = job.cluster_id.ok_or_else(|| RunnerError::InvalidInput("job has no cluster_id".into()))?;
        self.clusters.get(cluster_id).ok_or_else(|| RunnerError::InvalidInput(format!("unknown cluster {cluster_id}")))
    }

    fn defaults_for(cluster: &Cluster) -> SlurmDefaults {
        serde_json::from_value(cluster.connection_config.clone()).unwrap_or_default()
    }

    fn render_script(job: &Job, defaults: &SlurmDefaults, work_dir: &str, input_path: &str) -> RunnerResult<String> {
        let parallelism = job.parallelism.unwrap_or_default();
        let mut directives = Vec::new();
        directives.push(format!("#SBATCH --job-name=cm-{}", job.id));
        directives.push(format!("#SBATCH --nodes={}", parallelism.nodes.max(1)));
        directives.push(format!("#SBATCH --ntasks={}", parallelism.ranks.max(1)));
        directives.push(format!("#SBATCH --cpus-per-task={}", parallelism.threads.max(1)));
        directives.push(format!("#SBATCH --chdir={}", work_dir));

        if let Some(partition) = &defaults.partition {
            validate("partition", partition)?;
            directives.push(format!("#SBATCH --partition={partition}"));
        }
        if let Some(account) = &defaults.account {
            validate("account", account)?;
            directives.push(format!("#SBATCH --account={account}"));
        }
        if let Some(qos) = &defaults.qos {
            validate("qos", qos)?;
            directives.push(format!("#SBATCH --qos={qos}"));
        }

        let mut body = String::from("#!/bin/bash\n");
        for d in &directives {
            body.push_str(d);
            body.push('\n');
        }
        for module in &defaults.modules {
            validate("module", module)?;
            body.push_str(&format!("module load {module}\n"));
        }
        body.push_str(&format!("crystalOMP < {input_path} > stdout.log 2> stderr.log\n"));
        Ok(body)
    }
}

#[async_trait]
impl Runner for SlurmRunner {
    async fn submit(&self, job: &Job, prepared_input: &str) -> RunnerResult<RemoteHandle> {
        let cluster = self.cluster_for(job)?;
        let defaults = Self::defaults_for(&cluster);
        let work_dir = format!("{}/cm-job-{}", defaults.remote_scratch_base, job.id);
        self.pool.exec(&cluster, &format!("mkdir -p {}", crate::ssh::quoting::quote(&work_dir))).await?;

        let input_path = format!("{work_dir}/input");
        self.pool.write_file(&cluster, &input_path, prepared_input.as_bytes()).await?;

        let script = Self::render_script(job, &defaults, &work_dir, &input_path)?;
        let script_path = format!("{work_dir}/job.sbatch");
        self.pool.write_file(&cluster, &script_path, script.as_bytes()).await?;

        let (status, output) =
            self.pool.exec(&cluster, &format!("sbatch {}", crate::ssh::quoting::quote(&script_path))).await?;
        if status != 0 {
            return Err(RunnerError::Scheduler(format!("sbatch failed: {output}")));
        }
        let job_id = parse_sbatch_job_id(&output)
            .ok_or_else(|| RunnerError::Scheduler(format!("could not parse sbatch output: {output:?}")))?;

        self.jobs
            .lock()
            .insert(job_id.clone(), Arc::new(RemoteJobEntry { cluster, status: Mutex::new(RunnerStatus::Queued) }));
        Ok(RemoteHandle::SlurmJobId(job_id))
    }

    async fn poll(&self, handle: &RemoteHandle) -> RunnerResult<RunnerStatus> {
        let job_id = slurm_id(handle)?;
        let entry = self.entry(&job_id)?;
        {
            let status = entry.status.lock();
            if status.is_terminal() {
                return Ok(status.clone());
            }
        }

        let (_, output) = self.pool.exec(&entry.cluster, &format!("squeue -j {job_id} -h -o %T")).await?;
        let state = output.trim();
        let resolved = match state {
            "" => self.exit_code_via_sacct(&entry, &job_id).await?,
            "PENDING" => RunnerStatus::Queued,
            "RUNNING" => RunnerStatus::Running,
            "COMPLETED" => RunnerStatus::Completed { exit_code: 0, end_time_ms: now_ms() },
            "FAILED" | "TIMEOUT" | "NODE_FAIL" | "OUT_OF_MEMORY" => {
                RunnerStatus::Failed { reason: format!("slurm state {state}") }
            }
            "CANCELLED" => RunnerStatus::Cancelled,
            other => RunnerStatus::Failed { reason: format!("unrecognized slurm state {other}") },
        };
        *entry.status.lock() = resolved.clone();
        Ok(resolved)
    }

    async fn cancel(&self, handle: &RemoteHandle) -> RunnerResult<bool> {
        let job_id = slurm_id(handle)?;
        let entry = self.entry(&job_id)?;
        let mut status = entry.status.lock();
        if status.is_terminal() {
            return Ok(false);
        }
        self.pool.exec(&entry.cluster, &format!("scancel {job_id}")).await?;
        *status = RunnerStatus::Cancelled;
        Ok(true)
    }

    async fn retrieve(&self, handle: &RemoteHandle, dest_dir: &Path) -> RunnerResult<()> {
        let job_id = slurm_id(handle)?;
        let entry = self.entry(&job_id)?;
        let defaults = Self::defaults_for(&entry.cluster);
        std::fs::create_dir_all(dest_dir)?;
        for name in ["stdout.log", "stderr.log"] {
            let remote_path = format!("{}/cm-job-{job_id}/{name}", defaults.remote_scratch_base);
            if let Ok(bytes) = self.pool.read_file(&entry.cluster, &remote_path).await {
                std::fs::write(dest_dir.join(name), bytes)?;
            }
        }
        Ok(())
    }

    async fn stream_logs(&self, handle: &RemoteHandle) -> RunnerResult<LogStream> {
        let job_id = slurm_id(handle)?;
        let entry = self.entry(&job_id)?;
        let defaults = Self::defaults_for(&entry.cluster);
        let remote_path = format!("{}/cm-job-{job_id}/stdout.log", defaults.remote_scratch_base);
        let bytes = self.pool.read_file(&entry.cluster, &remote_path).await.unwrap_or_default();

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

impl SlurmRunner {
    fn entry(&self, job_id: &str) -> RunnerResult<Arc<RemoteJobEntry>> {
        self.jobs.lock().get(job_id).cloned().ok_or_else(|| RunnerError::UnknownHandle(job_id.to_string()))
    }

    async fn exit_code_via_sacct(&self, entry: &RemoteJobEntry, job_id: &str) -> RunnerResult<RunnerStatus> {
        let (_, output) =
            self.pool.exec(&entry.cluster, &format!("sacct -j {job_id} -n -o ExitCode -P | head -n1")).await?;
        let exit_code = output.trim().split(':').next().and_then(|s| s.parse::<i32>().ok()).unwrap_or(-1);
        Ok(if exit_code == 0 {
            RunnerStatus::Completed { exit_code: 0, end_time_ms: now_ms() }
        } else {
            RunnerStatus::Failed { reason: format!("sacct reported exit code {exit_code}") }
        })
    }
}

fn slurm_id(handle: &RemoteHandle) -> RunnerResult<String> {
    match handle {
        RemoteHandle::SlurmJobId(id) => Ok(id.clone()),
        RemoteHandle::Pid(_) => Err(RunnerError::UnknownHandle(handle.to_string())),
    }
}

fn parse_sbatch_job_id(output: &str) -> Option<String> {
    output.trim().rsplit(' ').next().map(|s| s.to_string()).filter(|s| s.chars().all(|c| c.is_ascii_digit()))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "slurm_tests.rs"]
mod tests;
