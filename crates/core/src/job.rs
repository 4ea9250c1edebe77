// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity and lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cluster::ClusterId;
use crate::workflow::WorkflowId;
use crate::workflow_node::NodeId;

crate::define_int_id! {
    /// Unique identifier for a job instance. Monotonic, assigned by the Store.
    pub struct JobId;
}

/// Lifecycle status of a job.
///
/// Transitions form a prefix of `Pending -> Queued -> Running ->
/// (Completed | Failed | Cancelled)`. There is no backward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses: `Completed`, `Failed`, `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Returns `true` if `next` is a legal transition from `self`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Queued)
                | (Pending, Cancelled)
                | (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                // retry: a Failed job that still has retry budget is requeued
                | (Failed, Queued)
        )
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Execution backend a job is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerType {
    Local,
    Ssh,
    Slurm,
}

crate::simple_display! {
    RunnerType {
        Local => "local",
        Ssh => "ssh",
        Slurm => "slurm",
    }
}

/// How a job should be parallelized by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelismMode {
    Serial,
    Mpi,
    Hybrid,
}

/// Resolved parallelism knobs consumed by runners when constructing the
/// launch command / batch-script directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelismConfig {
    pub mode: ParallelismMode,
    pub ranks: u32,
    pub threads: u32,
    pub nodes: u32,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self { mode: ParallelismMode::Serial, ranks: 1, threads: 1, nodes: 1 }
    }
}

/// Configuration for creating a new job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub name: String,
    pub work_dir: PathBuf,
    pub input_blob: String,
    pub runner_type: RunnerType,
    pub cluster_id: Option<ClusterId>,
    pub parallelism: Option<ParallelismConfig>,
    pub parent_workflow: Option<WorkflowId>,
    pub parent_node: Option<NodeId>,
}

impl JobConfig {
    pub fn builder(name: impl Into<String>, work_dir: impl Into<PathBuf>) -> JobConfigBuilder {
        JobConfigBuilder {
            name: name.into(),
            work_dir: work_dir.into(),
            input_blob: String::new(),
            runner_type: RunnerType::Local,
            cluster_id: None,
            parallelism: None,
            parent_workflow: None,
            parent_node: None,
        }
    }
}

pub struct JobConfigBuilder {
    name: String,
    work_dir: PathBuf,
    input_blob: String,
    runner_type: RunnerType,
    cluster_id: Option<ClusterId>,
    parallelism: Option<ParallelismConfig>,
    parent_workflow: Option<WorkflowId>,
    parent_node: Option<NodeId>,
}

impl JobConfigBuilder {
    crate::setters! {
        into {
            input_blob: String,
        }
        set {
            runner_type: RunnerType,
            parallelism: Option<ParallelismConfig>,
        }
        option {
            cluster_id: ClusterId,
            parent_workflow: WorkflowId,
            parent_node: NodeId,
        }
    }

    pub fn build(self) -> JobConfig {
        JobConfig {
            name: self.name,
            work_dir: self.work_dir,
            input_blob: self.input_blob,
            runner_type: self.runner_type,
            cluster_id: self.cluster_id,
            parallelism: self.parallelism,
            parent_workflow: self.parent_workflow,
            parent_node: self.parent_node,
        }
    }
}

/// A single execution unit tracked by the Store and scheduled by the Queue
/// Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    /// Unique per job; the directory inputs are rendered into and outputs
    /// are produced in.
    pub work_dir: PathBuf,
    pub status: JobStatus,
    pub input_blob: String,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub final_energy: Option<f64>,
    pub results_blob: Option<String>,
    pub cluster_id: Option<ClusterId>,
    pub runner_type: RunnerType,
    pub parallelism: Option<ParallelismConfig>,
    pub queue_time_ms: Option<u64>,
    pub parent_workflow: Option<WorkflowId>,
    pub parent_node: Option<NodeId>,
}

impl Job {
    /// Directory where the job's artifacts and logs live.
    pub fn execution_dir(&self) -> &std::path::Path {
        &self.work_dir
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            name: String = "j1",
            work_dir: PathBuf = "/tmp/cm-test/j1",
            input_blob: String = "",
        }
        set {
            id: JobId = JobId::new(1),
            status: JobStatus = JobStatus::Pending,
            created_at_ms: u64 = 0,
            runner_type: RunnerType = RunnerType::Local,
            parallelism: Option<ParallelismConfig> = None,
        }
        option {
            started_at_ms: u64 = None,
            ended_at_ms: u64 = None,
            exit_code: i32 = None,
            pid: u32 = None,
            final_energy: f64 = None,
            results_blob: String = None,
            cluster_id: ClusterId = None,
            queue_time_ms: u64 = None,
            parent_workflow: WorkflowId = None,
            parent_node: NodeId = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
