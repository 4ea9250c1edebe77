// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow entity: a DAG of [`crate::workflow_node::WorkflowNode`]s.

use serde::{Deserialize, Serialize};

crate::define_int_id! {
    /// Unique identifier for a workflow. Monotonic, assigned by the Store.
    pub struct WorkflowId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    WorkflowStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled)
    }
}

/// How the orchestrator reacts to a node ending in `Failed`/`Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    FailFast,
    ContinueOnFailure,
    Retry,
}

crate::simple_display! {
    FailurePolicy {
        FailFast => "fail_fast",
        ContinueOnFailure => "continue_on_failure",
        Retry => "retry",
    }
}

/// A DAG of workflow nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub status: WorkflowStatus,
    pub created_at_ms: u64,
    pub failure_policy: FailurePolicy,
}

crate::builder! {
    pub struct WorkflowBuilder => Workflow {
        into {
            name: String = "workflow-1",
        }
        set {
            id: WorkflowId = WorkflowId::new(1),
            status: WorkflowStatus = WorkflowStatus::Pending,
            created_at_ms: u64 = 0,
            failure_policy: FailurePolicy = FailurePolicy::FailFast,
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
