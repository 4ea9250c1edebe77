// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Association between a job and its cluster-side execution handle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cluster::ClusterId;
use crate::job::JobId;

/// The remote-side identifier for a dispatched job: a PID for SSH, a
/// SLURM job id for SLURM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RemoteHandle {
    Pid(u32),
    SlurmJobId(String),
}

impl std::fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteHandle::Pid(pid) => write!(f, "{}", pid),
            RemoteHandle::SlurmJobId(id) => write!(f, "{}", id),
        }
    }
}

/// Created at dispatch, updated at each poll, retained after terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteJob {
    pub job_id: JobId,
    pub cluster_id: ClusterId,
    pub remote_handle: RemoteHandle,
    pub remote_work_dir: String,
    pub queue_name: Option<String>,
    pub node_list: Option<String>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl RemoteJob {
    pub fn new(
        job_id: JobId,
        cluster_id: ClusterId,
        remote_handle: RemoteHandle,
        remote_work_dir: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            cluster_id,
            remote_handle,
            remote_work_dir: remote_work_dir.into(),
            queue_name: None,
            node_list: None,
            stdout_path: None,
            stderr_path: None,
            metadata: HashMap::new(),
        }
    }

    crate::setters! {
        option {
            queue_name: String,
            node_list: String,
            stdout_path: String,
            stderr_path: String,
        }
    }
}

#[cfg(test)]
#[path = "remote_job_tests.rs"]
mod tests;
