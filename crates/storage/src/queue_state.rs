// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `QueuedJobState` rows — enqueue-time metadata the Queue Manager rebuilds
//! its in-memory priority structure from at startup.

use rusqlite::{params, Row};

use cm_core::{ClusterId, JobId, Priority, QueuedJobState, ResourceMap, RunnerType};

use crate::error::StoreResult;
use crate::Store;

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

fn row_to_queue_state(row: &Row<'_>) -> rusqlite::Result<QueuedJobState> {
    let runner_str: String = row.get("runner_type")?;
    let resources_json: String = row.get("resource_requirements")?;
    Ok(QueuedJobState {
        job_id: JobId::new(row.get("job_id")?),
        priority: Priority::new(row.get::<_, i64>("priority")? as u8),
        enqueued_at_ms: row.get::<_, i64>("enqueued_at_ms")? as u64,
        retry_count: row.get::<_, i64>("retry_count")? as u32,
        max_retries: row.get::<_, i64>("max_retries")? as u32,
        runner_type: runner_from_str(&runner_str)?,
        cluster_id: row.get::<_, Option<i64>>("cluster_id")?.map(ClusterId::new),
        user_id: row.get("user_id")?,
        resource_requirements: serde_json::from_str::<ResourceMap>(&resources_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
    })
}

impl Store {
    /// Upsert one job's queue-time metadata, and reflect its status as
    /// `Queued` in the `Jobs` table.
    pub fn save_queue_state(&self, state: &QueuedJobState) -> StoreResult<()> {
        let conn = self.conn.lock();
        let resources_json = serde_json::to_string(&state.resource_requirements)?;
        conn.execute(
            "INSERT INTO QueueState (job_id, priority, enqueued_at_ms, retry_count, max_retries, runner_type, cluster_id, user_id, resource_requirements)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(job_id) DO UPDATE SET
                priority = excluded.priority,
                retry_count = excluded.retry_count,
                max_retries = excluded.max_retries,
                cluster_id = excluded.cluster_id,
                resource_requirements = excluded.resource_requirements",
            params![
                state.job_id.get(),
                state.priority.get(),
                state.enqueued_at_ms as i64,
                state.retry_count,
                state.max_retries,
                runner_to_str(state.runner_type),
                state.cluster_id.map(|c| c.get()),
                state.user_id,
                resources_json,
            ],
        )?;
        conn.execute("UPDATE Jobs SET status = 'queued' WHERE id = ?1", params![state.job_id.get()])?;
        Ok(())
    }

    /// Delete queue-time metadata for a job that has reached a terminal
    /// status and fired its dependents.
    pub fn remove_queue_state(&self, job_id: JobId) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM QueueState WHERE job_id = ?1", params![job_id.get()])?;
        Ok(())
    }

    /// The Queue Manager's startup recovery path: rebuild `queuedJobs` from
    /// every still-enqueued row.
    pub fn load_all_queue_state(&self) -> StoreResult<Vec<QueuedJobState>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM QueueState ORDER BY job_id")?;
        let rows = stmt.query_map([], row_to_queue_state)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

#[cfg(test)]
#[path = "queue_state_tests.rs"]
mod tests;
