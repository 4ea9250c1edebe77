// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migration.
//!
//! Each open reads the single row in `SchemaVersion` and applies any
//! pending migrations in order. Every migration checks whether its target
//! tables/columns already exist before creating them, so re-applying a
//! migration against an up-to-date database is a no-op.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

/// The schema version this binary understands. Bump alongside adding an
/// entry to [`MIGRATIONS`].
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, apply: migrate_v1 },
    Migration { version: 2, apply: migrate_v2 },
];

/// Version 1: the original job-only schema.
fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS Jobs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            work_dir        TEXT NOT NULL,
            status          TEXT NOT NULL,
            input_blob      TEXT NOT NULL,
            created_at_ms   INTEGER NOT NULL,
            started_at_ms   INTEGER,
            ended_at_ms     INTEGER,
            exit_code       INTEGER,
            pid             INTEGER,
            final_energy    REAL,
            results_blob    TEXT,
            cluster_id      INTEGER,
            runner_type     TEXT NOT NULL DEFAULT 'local',
            parallelism     TEXT,
            queue_time_ms   INTEGER,
            parent_workflow INTEGER,
            parent_node     INTEGER
        );",
    )
}

/// Version 2: clusters, remote-job handles, dependencies, workflows,
/// queue state, and scheduler metrics. Existing `Jobs` rows already default
/// `runner_type` to `'local'` and leave `cluster_id` nullable, so no
/// backfill is required beyond the column defaults set in v1.
fn migrate_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS Clusters (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            name                TEXT NOT NULL,
            kind                TEXT NOT NULL,
            host                TEXT NOT NULL,
            port                INTEGER NOT NULL,
            user                TEXT NOT NULL,
            connection_config  TEXT NOT NULL,
            status              TEXT NOT NULL,
            max_concurrent      INTEGER NOT NULL,
            available_resources TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ClusterState (
            cluster_id      INTEGER PRIMARY KEY REFERENCES Clusters(id) ON DELETE CASCADE,
            running_jobs    INTEGER NOT NULL DEFAULT 0,
            last_polled_ms  INTEGER,
            last_error      TEXT
        );

        CREATE TABLE IF NOT EXISTS RemoteJobs (
            job_id          INTEGER PRIMARY KEY REFERENCES Jobs(id) ON DELETE CASCADE,
            cluster_id      INTEGER NOT NULL REFERENCES Clusters(id),
            remote_handle   TEXT NOT NULL,
            remote_work_dir TEXT NOT NULL,
            queue_name      TEXT,
            node_list       TEXT,
            stdout_path     TEXT,
            stderr_path     TEXT,
            metadata        TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS JobDependencies (
            job_id             INTEGER NOT NULL REFERENCES Jobs(id) ON DELETE CASCADE,
            depends_on_job_id  INTEGER NOT NULL REFERENCES Jobs(id) ON DELETE CASCADE,
            kind               TEXT NOT NULL,
            PRIMARY KEY (job_id, depends_on_job_id)
        );

        CREATE TABLE IF NOT EXISTS Workflows (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            status          TEXT NOT NULL,
            created_at_ms   INTEGER NOT NULL,
            failure_policy  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS WorkflowNodes (
            node_id             INTEGER PRIMARY KEY AUTOINCREMENT,
            workflow_id         INTEGER NOT NULL REFERENCES Workflows(id) ON DELETE CASCADE,
            name                TEXT NOT NULL,
            template_ref        TEXT NOT NULL,
            parameter_template  TEXT NOT NULL DEFAULT '',
            dependencies        TEXT NOT NULL DEFAULT '[]',
            job_id              INTEGER REFERENCES Jobs(id),
            status              TEXT NOT NULL,
            results_blob        TEXT
        );

        CREATE TABLE IF NOT EXISTS QueueState (
            job_id                  INTEGER PRIMARY KEY REFERENCES Jobs(id) ON DELETE CASCADE,
            priority                INTEGER NOT NULL,
            enqueued_at_ms          INTEGER NOT NULL,
            retry_count             INTEGER NOT NULL DEFAULT 0,
            max_retries             INTEGER NOT NULL,
            runner_type             TEXT NOT NULL,
            cluster_id              INTEGER REFERENCES Clusters(id),
            user_id                 TEXT,
            resource_requirements   TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS SchedulerMetrics (
            id                  INTEGER PRIMARY KEY CHECK (id = 1),
            jobs_dispatched     INTEGER NOT NULL DEFAULT 0,
            jobs_completed      INTEGER NOT NULL DEFAULT 0,
            jobs_failed         INTEGER NOT NULL DEFAULT 0,
            jobs_retried        INTEGER NOT NULL DEFAULT 0,
            jobs_cancelled      INTEGER NOT NULL DEFAULT 0
        );
        INSERT OR IGNORE INTO SchedulerMetrics (id) VALUES (1);",
    )
}

/// Open (creating if necessary) the `SchemaVersion` row and apply every
/// migration with `version > current`, in order.
pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS SchemaVersion (id INTEGER PRIMARY KEY CHECK (id = 1), version INTEGER NOT NULL);
         INSERT OR IGNORE INTO SchemaVersion (id, version) VALUES (1, 0);",
    )?;

    let current: u32 = conn.query_row("SELECT version FROM SchemaVersion WHERE id = 1", [], |row| row.get(0))?;

    if current > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew { found: current, supported: CURRENT_SCHEMA_VERSION });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        (migration.apply)(conn)?;
        conn.execute("UPDATE SchemaVersion SET version = ?1 WHERE id = 1", rusqlite::params![migration.version])?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "migrations_tests.rs"]
mod tests;
