// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::cluster::{Cluster, ClusterId};
use crate::job::{Job, JobId, JobStatus};
use crate::workflow::{Workflow, WorkflowId, WorkflowStatus};
use crate::workflow_node::{NodeId, WorkflowNode};

/// A `Pending` job with no cluster or workflow attached, ready to be
/// enqueued in a test.
pub fn pending_job(id: i64) -> Job {
    Job::builder().id(JobId::new(id)).name(format!("job-{id}")).build()
}

/// A `Running` job on `cluster_id`, as if the scheduler had already
/// dispatched it.
pub fn running_job(id: i64, cluster_id: i64) -> Job {
    Job::builder()
        .id(JobId::new(id))
        .status(JobStatus::Running)
        .cluster_id(ClusterId::new(cluster_id))
        .started_at_ms(1_000)
        .build()
}

/// An `Active` SSH cluster with default concurrency and no resource limits.
pub fn test_cluster(id: i64) -> Cluster {
    Cluster::builder().id(ClusterId::new(id)).build()
}

/// A `Pending` workflow with the given name, no nodes attached.
pub fn pending_workflow(id: i64, name: &str) -> Workflow {
    Workflow::builder().id(WorkflowId::new(id)).name(name).build()
}

/// A node with no dependencies, belonging to `workflow_id`.
pub fn leaf_node(node_id: i64, workflow_id: i64, name: &str) -> WorkflowNode {
    WorkflowNode::new(NodeId::new(node_id), WorkflowId::new(workflow_id), name, "template.ref")
}
