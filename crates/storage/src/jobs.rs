// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job rows: `CreateJob`, `UpdateStatus`, and the read paths the scheduler
//! tick depends on.

use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

use cm_core::{
    ClusterId, Job, JobConfig, JobId, JobStatus, NodeId, ParallelismConfig, RunnerType, WorkflowId,
};

use crate::error::{StoreError, StoreResult};
use crate::Store;

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> rusqlite::Result<JobStatus> {
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

fn runner_to_str(runner: RunnerType) -> &'static str {
    match runner {
        RunnerType::Local => "local",
        RunnerType::Ssh => "ssh",
        RunnerType::Slurm => "slurm",
    }
}

fn runner_from_str(s: &str) -> rusqlite::Result<RunnerType> {
    match s {
        "local" => Ok(RunnerType::Local),
        "ssh" => Ok(RunnerType::Ssh),
        "slurm" => Ok(RunnerType::Slurm),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    let status_str: String = row.get("status")?;
    let runner_str: String = row.get("runner_type")?;
    let parallelism_json: Option<String> = row.get("parallelism")?;
    let parallelism: Option<ParallelismConfig> = parallelism_json
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(Job {
        id: JobId::new(row.get("id")?),
        name: row.get("name")?,
        work_dir: row.get::<_, String>("work_dir")?.into(),
        status: status_from_str(&status_str)?,
        input_blob: row.get("input_blob")?,
        created_at_ms: row.get::<_, i64>("created_at_ms")? as u64,
        started_at_ms: row.get::<_, Option<i64>>("started_at_ms")?.map(|v| v as u64),
        ended_at_ms: row.get::<_, Option<i64>>("ended_at_ms")?.map(|v| v as u64),
        exit_code: row.get("exit_code")?,
        pid: row.get::<_, Option<i64>>("pid")?.map(|v| v as u32),
        final_energy: row.get("final_energy")?,
        results_blob: row.get("results_blob")?,
        cluster_id: row.get::<_, Option<i64>>("cluster_id")?.map(ClusterId::new),
        runner_type: runner_from_str(&runner_str)?,
        parallelism,
        queue_time_ms: row.get::<_, Option<i64>>("queue_time_ms")?.map(|v| v as u64),
        parent_workflow: row.get::<_, Option<i64>>("parent_workflow")?.map(WorkflowId::new),
        parent_node: row.get::<_, Option<i64>>("parent_node")?.map(NodeId::new),
    })
}

impl Store {
    /// Insert a `Pending` job. Fails with [`StoreError::Sqlite`] wrapping a
    /// `SQLITE_CONSTRAINT_UNIQUE` when `work_dir` collides with an existing row.
    pub fn create_job(&self, config: JobConfig, created_at_ms: u64) -> StoreResult<JobId> {
        let conn = self.conn.lock();
        let parallelism_json = config.parallelism.map(|p| serde_json::to_string(&p)).transpose()?;
        conn.execute(
            "INSERT INTO Jobs (name, work_dir, status, input_blob, created_at_ms, cluster_id, runner_type, parallelism, parent_workflow, parent_node)
             VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                config.name,
                config.work_dir.to_string_lossy(),
                config.input_blob,
                created_at_ms as i64,
                config.cluster_id.map(|c| c.get()),
                runner_to_str(config.runner_type),
                parallelism_json,
                config.parent_workflow.map(|w| w.get()),
                config.parent_node.map(|n| n.get()),
            ],
        )?;
        Ok(JobId::new(conn.last_insert_rowid()))
    }

    /// Transition a job's status, recording `exit_code`/`ended_at_ms` if given.
    /// Returns [`StoreError::NotFound`] if `id` is absent. Does not itself
    /// validate the transition against [`JobStatus::can_transition_to`] —
    /// callers (the Queue Manager) own that check since they hold the
    /// preceding status in memory.
    pub fn update_job_status(
        &self,
        id: JobId,
        new_status: JobStatus,
        exit_code: Option<i32>,
        ended_at_ms: Option<u64>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        let started_at_update = if new_status == JobStatus::Running {
            ", started_at_ms = COALESCE(started_at_ms, (strftime('%s','now') * 1000))"
        } else {
            ""
        };
        let sql = format!(
            "UPDATE Jobs SET status = ?1, exit_code = COALESCE(?2, exit_code), ended_at_ms = COALESCE(?3, ended_at_ms){started_at_update} WHERE id = ?4"
        );
        let changed = conn.execute(
            &sql,
            params![status_to_str(new_status), exit_code, ended_at_ms.map(|v| v as i64), id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "Job", id: id.get() });
        }
        Ok(())
    }

    pub fn get_job(&self, id: JobId) -> StoreResult<Option<Job>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM Jobs WHERE id = ?1", params![id.get()], row_to_job).optional().map_err(Into::into)
    }

    pub fn get_jobs_by_status(&self, status: JobStatus, limit: u32) -> StoreResult<Vec<Job>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM Jobs WHERE status = ?1 ORDER BY id LIMIT ?2")?;
        let rows = stmt.query_map(params![status_to_str(status), limit], row_to_job)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn get_all_jobs(&self, limit: u32) -> StoreResult<Vec<Job>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM Jobs ORDER BY id LIMIT ?1")?;
        let rows = stmt.query_map(params![limit], row_to_job)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Fetch many jobs' statuses in a single query, regardless of `ids.len()`.
    /// The scheduler tick relies on this being O(1) round trips.
    pub fn get_job_statuses_batch(&self, ids: &[JobId]) -> StoreResult<HashMap<JobId, JobStatus>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn.lock();
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!("SELECT id, status FROM Jobs WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|id| &id.0 as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            let id: i64 = row.get(0)?;
            let status: String = row.get(1)?;
            Ok((JobId::new(id), status))
        })?;
        let mut out = HashMap::new();
        for row in rows {
            let (id, status_str) = row?;
            out.insert(id, status_from_str(&status_str)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
