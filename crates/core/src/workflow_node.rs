// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single step of a workflow, and the submission-time DTOs used to
//! describe a DAG before the orchestrator materializes it into rows.

use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus, RunnerType};
use crate::workflow::WorkflowId;

crate::define_int_id! {
    /// Unique identifier for a workflow node. Monotonic, assigned by the Store.
    pub struct NodeId;
}

/// One step of a workflow's DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub node_id: NodeId,
    pub workflow_id: WorkflowId,
    pub name: String,
    /// Opaque string the input-generator consumes; never interpreted here.
    pub template_ref: String,
    /// `{{upstream.node.key}}`-style substitutions, resolved before dispatch.
    pub parameter_template: String,
    pub dependencies: Vec<NodeId>,
    /// Set once the orchestrator enqueues the node as a job.
    pub job_id: Option<JobId>,
    pub status: JobStatus,
    pub results_blob: Option<String>,
}

impl WorkflowNode {
    pub fn new(
        node_id: NodeId,
        workflow_id: WorkflowId,
        name: impl Into<String>,
        template_ref: impl Into<String>,
    ) -> Self {
        Self {
            node_id,
            workflow_id,
            name: name.into(),
            template_ref: template_ref.into(),
            parameter_template: String::new(),
            dependencies: Vec::new(),
            job_id: None,
            status: JobStatus::Pending,
            results_blob: None,
        }
    }

    crate::setters! {
        into {
            parameter_template: String,
        }
        set {
            dependencies: Vec<NodeId>,
            status: JobStatus,
        }
        option {
            job_id: JobId,
            results_blob: String,
        }
    }

    /// `true` once every entry in `dependencies` has been satisfied by `satisfied`.
    pub fn dependencies_satisfied(&self, satisfied: &[NodeId]) -> bool {
        self.dependencies.iter().all(|dep| satisfied.contains(dep))
    }
}

/// Submission-time description of one node, as sent by `workflows.submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNodeSpec {
    /// Caller-chosen key, unique within the enclosing [`WorkflowSpec`]. Used
    /// to express `dependencies` and `{{upstream.key.output}}` references
    /// before the orchestrator assigns real [`NodeId`]s.
    pub key: String,
    pub name: String,
    pub template_ref: String,
    #[serde(default)]
    pub parameter_template: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub runner_type: Option<RunnerType>,
}

/// Submission-time description of an entire workflow, as sent by
/// `workflows.submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    pub nodes: Vec<WorkflowNodeSpec>,
    #[serde(default)]
    pub failure_policy: Option<crate::workflow::FailurePolicy>,
}

#[cfg(test)]
#[path = "workflow_node_tests.rs"]
mod tests;
