// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow and WorkflowNode rows.

use rusqlite::{params, OptionalExtension, Row};

use cm_core::{
    FailurePolicy, JobId, JobStatus, NodeId, Workflow, WorkflowId, WorkflowNode, WorkflowStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::Store;

fn workflow_status_to_str(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Pending => "pending",
        WorkflowStatus::Running => "running",
        WorkflowStatus::Completed => "completed",
        WorkflowStatus::Failed => "failed",
        WorkflowStatus::Cancelled => "cancelled",
    }
}

fn workflow_status_from_str(s: &str) -> rusqlite::Result<WorkflowStatus> {
    match s {
        "pending" => Ok(WorkflowStatus::Pending),
        "running" => Ok(WorkflowStatus::Running),
        "completed" => Ok(WorkflowStatus::Completed),
        "failed" => Ok(WorkflowStatus::Failed),
        "cancelled" => Ok(WorkflowStatus::Cancelled),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn failure_policy_to_str(policy: FailurePolicy) -> &'static str {
    match policy {
        FailurePolicy::FailFast => "fail_fast",
        FailurePolicy::ContinueOnFailure => "continue_on_failure",
        FailurePolicy::Retry => "retry",
    }
}

fn failure_policy_from_str(s: &str) -> rusqlite::Result<FailurePolicy> {
    match s {
        "fail_fast" => Ok(FailurePolicy::FailFast),
        "continue_on_failure" => Ok(FailurePolicy::ContinueOnFailure),
        "retry" => Ok(FailurePolicy::Retry),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn job_status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn job_status_from_str(s: &str) -> rusqlite::Result<JobStatus> {
    match s {
        "pending" => Ok(JobStatus::Pending),
        "queued" => Ok(JobStatus::Queued),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        "cancelled" => Ok(JobStatus::Cancelled),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn row_to_workflow(row: &Row<'_>) -> rusqlite::Result<Workflow> {
    let status_str: String = row.get("status")?;
    let policy_str: String = row.get("failure_policy")?;
    Ok(Workflow {
        id: WorkflowId::new(row.get("id")?),
        name: row.get("name")?,
        status: workflow_status_from_str(&status_str)?,
        created_at_ms: row.get::<_, i64>("created_at_ms")? as u64,
        failure_policy: failure_policy_from_str(&policy_str)?,
    })
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<WorkflowNode> {
    let status_str: String = row.get("status")?;
    let dependencies_json: String = row.get("dependencies")?;
    let dependencies: Vec<i64> = serde_json::from_str(&dependencies_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(WorkflowNode {
        node_id: NodeId::new(row.get("node_id")?),
        workflow_id: WorkflowId::new(row.get("workflow_id")?),
        name: row.get("name")?,
        template_ref: row.get("template_ref")?,
        parameter_template: row.get("parameter_template")?,
        dependencies: dependencies.into_iter().map(NodeId::new).collect(),
        job_id: row.get::<_, Option<i64>>("job_id")?.map(JobId::new),
        status: job_status_from_str(&status_str)?,
        results_blob: row.get("results_blob")?,
    })
}

impl Store {
    pub fn create_workflow(&self, name: &str, failure_policy: FailurePolicy, created_at_ms: u64) -> StoreResult<WorkflowId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO Workflows (name, status, created_at_ms, failure_policy) VALUES (?1, 'pending', ?2, ?3)",
            params![name, created_at_ms as i64, failure_policy_to_str(failure_policy)],
        )?;
        Ok(WorkflowId::new(conn.last_insert_rowid()))
    }

    pub fn update_workflow_status(&self, id: WorkflowId, status: WorkflowStatus) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("UPDATE Workflows SET status = ?1 WHERE id = ?2", params![workflow_status_to_str(status), id.get()])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "Workflow", id: id.get() });
        }
        Ok(())
    }

    pub fn get_workflow(&self, id: WorkflowId) -> StoreResult<Option<Workflow>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM Workflows WHERE id = ?1", params![id.get()], row_to_workflow)
            .optional()
            .map_err(Into::into)
    }

    /// Insert a node with no dependencies yet resolved to job ids. `dependencies`
    /// are the node's own [`NodeId`]s within the same workflow.
    pub fn create_workflow_node(
        &self,
        workflow_id: WorkflowId,
        name: &str,
        template_ref: &str,
        parameter_template: &str,
        dependencies: &[NodeId],
    ) -> StoreResult<NodeId> {
        let conn = self.conn.lock();
        let dependencies_json = serde_json::to_string(&dependencies.iter().map(|d| d.get()).collect::<Vec<_>>())?;
        conn.execute(
            "INSERT INTO WorkflowNodes (workflow_id, name, template_ref, parameter_template, dependencies, status)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
            params![workflow_id.get(), name, template_ref, parameter_template, dependencies_json],
        )?;
        Ok(NodeId::new(conn.last_insert_rowid()))
    }

    /// Rewrite a node's dependency list. Used once every node in a workflow
    /// has been created and its sibling keys are known, since dependencies
    /// are expressed as [`NodeId`]s that don't exist until creation.
    pub fn set_node_dependencies(&self, node_id: NodeId, dependencies: &[NodeId]) -> StoreResult<()> {
        let conn = self.conn.lock();
        let dependencies_json = serde_json::to_string(&dependencies.iter().map(|d| d.get()).collect::<Vec<_>>())?;
        let changed = conn.execute(
            "UPDATE WorkflowNodes SET dependencies = ?1 WHERE node_id = ?2",
            params![dependencies_json, node_id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "WorkflowNode", id: node_id.get() });
        }
        Ok(())
    }

    pub fn get_workflow_nodes(&self, workflow_id: WorkflowId) -> StoreResult<Vec<WorkflowNode>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM WorkflowNodes WHERE workflow_id = ?1 ORDER BY node_id")?;
        let rows = stmt.query_map(params![workflow_id.get()], row_to_node)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Attach a dispatched job id to a node and mirror its status.
    pub fn set_node_job(&self, node_id: NodeId, job_id: JobId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE WorkflowNodes SET job_id = ?1, status = 'queued' WHERE node_id = ?2",
            params![job_id.get(), node_id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "WorkflowNode", id: node_id.get() });
        }
        Ok(())
    }

    pub fn update_node_status(&self, node_id: NodeId, status: JobStatus, results_blob: Option<&str>) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE WorkflowNodes SET status = ?1, results_blob = COALESCE(?2, results_blob) WHERE node_id = ?3",
            params![job_status_to_str(status), results_blob, node_id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "WorkflowNode", id: node_id.get() });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
