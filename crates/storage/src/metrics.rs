// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-row `SchedulerMetrics` snapshot.

use rusqlite::params;

use cm_core::SchedulerMetrics;

use crate::error::StoreResult;
use crate::Store;

impl Store {
    pub fn put_scheduler_metrics(&self, snapshot: &SchedulerMetrics) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE SchedulerMetrics SET jobs_dispatched = ?1, jobs_completed = ?2, jobs_failed = ?3, jobs_retried = ?4, jobs_cancelled = ?5 WHERE id = 1",
            params![
                snapshot.jobs_dispatched as i64,
                snapshot.jobs_completed as i64,
                snapshot.jobs_failed as i64,
                snapshot.jobs_retried as i64,
                snapshot.jobs_cancelled as i64,
            ],
        )?;
        Ok(())
    }

    /// Queue depth and active-job counts are derived live from `Jobs`
    /// rather than persisted, since they mirror state already in the table.
    pub fn get_scheduler_metrics(&self) -> StoreResult<SchedulerMetrics> {
        let conn = self.conn.lock();
        let mut metrics = conn.query_row(
            "SELECT jobs_dispatched, jobs_completed, jobs_failed, jobs_retried, jobs_cancelled FROM SchedulerMetrics WHERE id = 1",
            [],
            |row| {
                Ok(SchedulerMetrics {
                    jobs_dispatched: row.get::<_, i64>(0)? as u64,
                    jobs_completed: row.get::<_, i64>(1)? as u64,
                    jobs_failed: row.get::<_, i64>(2)? as u64,
                    jobs_retried: row.get::<_, i64>(3)? as u64,
                    jobs_cancelled: row.get::<_, i64>(4)? as u64,
                    queue_depth: 0,
                    active_jobs: 0,
                })
            },
        )?;
        metrics.queue_depth = conn.query_row("SELECT count(*) FROM QueueState", [], |row| row.get::<_, i64>(0))? as u64;
        metrics.active_jobs = conn.query_row("SELECT count(*) FROM Jobs WHERE status = 'running'", [], |row| row.get::<_, i64>(0))? as u64;
        Ok(metrics)
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
