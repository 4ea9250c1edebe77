// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RemoteJob` rows: the association between a job and its cluster-side
//! handle, created at dispatch and updated at each poll.

use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

use cm_core::{ClusterId, JobId, RemoteHandle, RemoteJob};

use crate::error::StoreResult;
use crate::Store;

fn handle_to_parts(handle: &RemoteHandle) -> (&'static str, String) {
    match handle {
        RemoteHandle::Pid(pid) => ("pid", pid.to_string()),
        RemoteHandle::SlurmJobId(id) => ("slurm_job_id", id.clone()),
    }
}

fn parts_to_handle(kind: &str, value: &str) -> rusqlite::Result<RemoteHandle> {
    match kind {
        "pid" => value
            .parse::<u32>()
            .map(RemoteHandle::Pid)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))),
        "slurm_job_id" => Ok(RemoteHandle::SlurmJobId(value.to_string())),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn row_to_remote_job(row: &Row<'_>) -> rusqlite::Result<RemoteJob> {
    let remote_handle_str: String = row.get("remote_handle")?;
    let (kind, value) = remote_handle_str
        .split_once(':')
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(0, remote_handle_str.clone(), rusqlite::types::Type::Text))?;
    let metadata_json: String = row.get("metadata")?;

    Ok(RemoteJob {
        job_id: JobId::new(row.get("job_id")?),
        cluster_id: ClusterId::new(row.get("cluster_id")?),
        remote_handle: parts_to_handle(kind, value)?,
        remote_work_dir: row.get("remote_work_dir")?,
        queue_name: row.get("queue_name")?,
        node_list: row.get("node_list")?,
        stdout_path: row.get("stdout_path")?,
        stderr_path: row.get("stderr_path")?,
        metadata: serde_json::from_str::<HashMap<String, String>>(&metadata_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
    })
}

impl Store {
    pub fn create_remote_job(&self, remote_job: &RemoteJob) -> StoreResult<()> {
        let conn = self.conn.lock();
        let (kind, value) = handle_to_parts(&remote_job.remote_handle);
        let metadata_json = serde_json::to_string(&remote_job.metadata)?;
        conn.execute(
            "INSERT INTO RemoteJobs (job_id, cluster_id, remote_handle, remote_work_dir, queue_name, node_list, stdout_path, stderr_path, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                remote_job.job_id.get(),
                remote_job.cluster_id.get(),
                format!("{kind}:{value}"),
                remote_job.remote_work_dir,
                remote_job.queue_name,
                remote_job.node_list,
                remote_job.stdout_path,
                remote_job.stderr_path,
                metadata_json,
            ],
        )?;
        Ok(())
    }

    pub fn get_remote_job(&self, job_id: JobId) -> StoreResult<Option<RemoteJob>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM RemoteJobs WHERE job_id = ?1", params![job_id.get()], row_to_remote_job)
            .optional()
            .map_err(Into::into)
    }

    /// Refresh the remote handle (e.g. SSH PID known only after the driver
    /// script starts) and/or artifact paths discovered at poll time.
    pub fn update_remote_job_paths(&self, job_id: JobId, stdout_path: Option<&str>, stderr_path: Option<&str>) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE RemoteJobs SET stdout_path = COALESCE(?1, stdout_path), stderr_path = COALESCE(?2, stderr_path) WHERE job_id = ?3",
            params![stdout_path, stderr_path, job_id.get()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "remote_jobs_tests.rs"]
mod tests;
