// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Param/result payloads for each entry in the `system.*`/`jobs.*`/
//! `clusters.*`/`workflows.*`/`events.*` method namespace. These travel as
//! the `params` of an [`crate::rpc::RpcRequest`] and the `result` of an
//! [`crate::rpc::RpcResponse`]; dispatch by method name is the caller's job.

use cm_core::{
    Cluster, ClusterId, ClusterKind, ClusterStatus, ConnectionConfig, DependencyKind, Job, JobId,
    JobStatus, NodeId, ParallelismConfig, ResourceMap, RunnerType, Workflow, WorkflowId,
    WorkflowNode, WorkflowNodeSpec, WorkflowStatus,
};
use serde::{Deserialize, Serialize};

// --- system.* ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingResult {
    pub pong: bool,
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionResult {
    pub server: String,
}

// --- jobs.* ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobsListParams {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsGetParams {
    pub id: JobId,
}

/// One dependency entry as submitted through `jobs.submit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDependencyParam {
    pub job_id: JobId,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsSubmitParams {
    pub name: String,
    pub input: String,
    #[serde(default = "default_runner_type")]
    pub runner: RunnerType,
    #[serde(default)]
    pub cluster_id: Option<ClusterId>,
    #[serde(default)]
    pub parallelism: Option<ParallelismConfig>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub deps: Vec<JobDependencyParam>,
}

fn default_runner_type() -> RunnerType {
    RunnerType::Local
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsSubmitResult {
    pub id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsCancelParams {
    pub id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsCancelResult {
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsLogParams {
    pub id: JobId,
    #[serde(default)]
    pub tail: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobsLogResult {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

/// `jobs.list`/`jobs.get` result row: the full [`Job`] minus nothing, since
/// unlike the teacher's system there's no oversized blob to trim out of a
/// list view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub runner_type: RunnerType,
    pub cluster_id: Option<ClusterId>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
    pub exit_code: Option<i32>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        JobSummary {
            id: job.id,
            name: job.name.clone(),
            status: job.status,
            runner_type: job.runner_type,
            cluster_id: job.cluster_id,
            created_at_ms: job.created_at_ms,
            started_at_ms: job.started_at_ms,
            ended_at_ms: job.ended_at_ms,
            exit_code: job.exit_code,
        }
    }
}

// --- clusters.* ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersGetParams {
    pub id: ClusterId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersCreateParams {
    pub name: String,
    pub kind: ClusterKind,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub connection_config: ConnectionConfig,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
    #[serde(default)]
    pub available_resources: Option<ResourceMap>,
}

fn default_ssh_port() -> u16 {
    22
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersUpdateParams {
    pub id: ClusterId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub connection_config: Option<ConnectionConfig>,
    #[serde(default)]
    pub status: Option<ClusterStatus>,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
    #[serde(default)]
    pub available_resources: Option<ResourceMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersDeleteParams {
    pub id: ClusterId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersDeleteResult {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersTestParams {
    pub id: ClusterId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClustersTestResult {
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Identical field set to [`Cluster`]; exists so clients never need
/// `cm-core` as a direct dependency just to decode a `clusters.list` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub name: String,
    pub kind: ClusterKind,
    pub host: String,
    pub port: u16,
    pub status: ClusterStatus,
    pub max_concurrent: u32,
    pub available_resources: ResourceMap,
}

impl From<&Cluster> for ClusterSummary {
    fn from(cluster: &Cluster) -> Self {
        ClusterSummary {
            id: cluster.id,
            name: cluster.name.clone(),
            kind: cluster.kind,
            host: cluster.host.clone(),
            port: cluster.port,
            status: cluster.status,
            max_concurrent: cluster.max_concurrent,
            available_resources: cluster.available_resources.clone(),
        }
    }
}

// --- workflows.* ---

/// `workflows.submit` params. `nodes` carries each node's own
/// `dependencies` (by key) rather than a separate top-level `edges` list:
/// one representation of the same DAG, matching how [`WorkflowNodeSpec`]
/// already models it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowsSubmitParams {
    pub name: String,
    pub nodes: Vec<WorkflowNodeSpec>,
    #[serde(default)]
    pub policy: Option<cm_core::FailurePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowsSubmitResult {
    pub id: WorkflowId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowsGetParams {
    pub id: WorkflowId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowsCancelParams {
    pub id: WorkflowId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowsCancelResult {
    pub cancelled: bool,
}

/// `workflows.get` result: the workflow plus its current node rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDetail {
    pub workflow: Workflow,
    pub nodes: Vec<WorkflowNode>,
}

// --- events.* ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventsSubscribeParams {
    pub topics: Vec<String>,
}

// --- notification payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusChanged {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowNodeStarted {
    pub workflow_id: WorkflowId,
    pub node_id: NodeId,
    pub job_id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowNodeCompleted {
    pub workflow_id: WorkflowId,
    pub node_id: NodeId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowCompleted {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowFailed {
    pub workflow_id: WorkflowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
#[path = "methods_tests.rs"]
mod tests;
