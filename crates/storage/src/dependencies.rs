// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobDependency` edges, with cycle detection on insert.

use rusqlite::params;
use std::collections::HashSet;

use cm_core::{DependencyKind, JobDependency, JobId};

use crate::error::{StoreError, StoreResult};
use crate::Store;

fn kind_to_str(kind: DependencyKind) -> &'static str {
    match kind {
        DependencyKind::AfterOk => "after_ok",
        DependencyKind::AfterAny => "after_any",
        DependencyKind::AfterFailed => "after_failed",
    }
}

fn kind_from_str(s: &str) -> rusqlite::Result<DependencyKind> {
    match s {
        "after_ok" => Ok(DependencyKind::AfterOk),
        "after_any" => Ok(DependencyKind::AfterAny),
        "after_failed" => Ok(DependencyKind::AfterFailed),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

impl Store {
    /// Record that `job_id` depends on `depends_on_job_id`. Rejects the
    /// insert with [`StoreError::DependencyCycle`] if it would close a
    /// cycle in the job-level dependency graph.
    pub fn add_job_dependency(&self, job_id: JobId, depends_on_job_id: JobId, kind: DependencyKind) -> StoreResult<()> {
        let conn = self.conn.lock();

        if job_id == depends_on_job_id || reaches(&conn, depends_on_job_id, job_id)? {
            return Err(StoreError::DependencyCycle { job_id: job_id.get(), depends_on_job_id: depends_on_job_id.get() });
        }

        conn.execute(
            "INSERT INTO JobDependencies (job_id, depends_on_job_id, kind) VALUES (?1, ?2, ?3)",
            params![job_id.get(), depends_on_job_id.get(), kind_to_str(kind)],
        )?;
        Ok(())
    }

    pub fn dependencies_for_job(&self, job_id: JobId) -> StoreResult<Vec<JobDependency>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT job_id, depends_on_job_id, kind FROM JobDependencies WHERE job_id = ?1")?;
        let rows = stmt.query_map(params![job_id.get()], |row| {
            let kind_str: String = row.get(2)?;
            Ok(JobDependency::new(JobId::new(row.get(0)?), JobId::new(row.get(1)?), kind_from_str(&kind_str)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Jobs that depend on `job_id`, i.e. the reverse edge direction from
    /// [`Self::dependencies_for_job`]. Used to find dependents to cancel when
    /// a job permanently fails.
    pub fn dependents_of(&self, job_id: JobId) -> StoreResult<Vec<JobDependency>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT job_id, depends_on_job_id, kind FROM JobDependencies WHERE depends_on_job_id = ?1")?;
        let rows = stmt.query_map(params![job_id.get()], |row| {
            let kind_str: String = row.get(2)?;
            Ok(JobDependency::new(JobId::new(row.get(0)?), JobId::new(row.get(1)?), kind_from_str(&kind_str)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

/// Breadth-first search: does a dependency edge path exist from `from` to `to`?
fn reaches(conn: &rusqlite::Connection, from: JobId, to: JobId) -> rusqlite::Result<bool> {
    let mut visited: HashSet<i64> = HashSet::new();
    let mut frontier = vec![from];

    while let Some(current) = frontier.pop() {
        if current == to {
            return Ok(true);
        }
        if !visited.insert(current.get()) {
            continue;
        }
        let mut stmt = conn.prepare("SELECT depends_on_job_id FROM JobDependencies WHERE job_id = ?1")?;
        let next = stmt.query_map(params![current.get()], |row| row.get::<_, i64>(0))?;
        for id in next {
            frontier.push(JobId::new(id?));
        }
    }
    Ok(false)
}

#[cfg(test)]
#[path = "dependencies_tests.rs"]
mod tests;
