// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-level dependency edges.

use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// How a dependency gates readiness of the dependent job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Ready once the dependency is `Completed`.
    AfterOk,
    /// Ready once the dependency reaches any terminal status.
    AfterAny,
    /// Ready once the dependency is `Failed`.
    AfterFailed,
}

crate::simple_display! {
    DependencyKind {
        AfterOk => "after_ok",
        AfterAny => "after_any",
        AfterFailed => "after_failed",
    }
}

/// An edge in the queue-level dependency graph: `job_id` depends on
/// `depends_on_job_id` per `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDependency {
    pub job_id: JobId,
    pub depends_on_job_id: JobId,
    pub kind: DependencyKind,
}

impl JobDependency {
    pub fn new(job_id: JobId, depends_on_job_id: JobId, kind: DependencyKind) -> Self {
        Self { job_id, depends_on_job_id, kind }
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
