// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by the store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("row failed to decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no row found for {entity} {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("schema is version {found}, which is newer than the {supported} this binary understands")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("adding a dependency on job {depends_on_job_id} would create a cycle through job {job_id}")]
    DependencyCycle { job_id: i64, depends_on_job_id: i64 },

    #[error("cluster {cluster_id} has non-terminal jobs and cannot be deleted")]
    ClusterHasActiveJobs { cluster_id: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;
