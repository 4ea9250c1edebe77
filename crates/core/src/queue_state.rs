// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enqueue-time metadata the Queue Manager reconstitutes its in-memory
//! priority structure from.

use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterId, ResourceMap};
use crate::job::{JobId, RunnerType};

/// Default number of attempts before a job is permanently failed.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default queue priority. `0` is highest, `4` is lowest.
pub const DEFAULT_PRIORITY: u8 = 2;

/// Scheduling priority, `0` (highest) through `4` (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);
    pub const LOWEST: Priority = Priority(4);

    /// Clamp `value` into the valid `0..=4` range.
    pub fn new(value: u8) -> Self {
        Self(value.min(4))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority(DEFAULT_PRIORITY)
    }
}

/// Enqueue-time metadata for a single job. One entry per non-dispatched job;
/// the Queue Manager's `queuedJobs` map is rebuilt from rows of this shape
/// at startup via `Store::load_all_queue_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJobState {
    pub job_id: JobId,
    pub priority: Priority,
    pub enqueued_at_ms: u64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub runner_type: RunnerType,
    pub cluster_id: Option<ClusterId>,
    pub user_id: Option<String>,
    pub resource_requirements: ResourceMap,
}

impl QueuedJobState {
    pub fn new(job_id: JobId, runner_type: RunnerType, enqueued_at_ms: u64) -> Self {
        Self {
            job_id,
            priority: Priority::default(),
            enqueued_at_ms,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            runner_type,
            cluster_id: None,
            user_id: None,
            resource_requirements: ResourceMap::new(),
        }
    }

    crate::setters! {
        set {
            priority: Priority,
            max_retries: u32,
            resource_requirements: ResourceMap,
        }
        option {
            cluster_id: ClusterId,
            user_id: String,
        }
    }

    pub fn has_retry_budget(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[cfg(test)]
#[path = "queue_state_tests.rs"]
mod tests;
