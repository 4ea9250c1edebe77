// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A point-in-time snapshot of scheduler activity, served by
//! `system.metrics` and persisted periodically so counts survive a restart.

use serde::{Deserialize, Serialize};

/// Cumulative counters since the daemon's current Store was initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    pub jobs_dispatched: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_retried: u64,
    pub jobs_cancelled: u64,
    /// Jobs currently sitting in the queue, not yet dispatched.
    pub queue_depth: u64,
    /// Jobs currently `Running` across every cluster.
    pub active_jobs: u64,
}

impl SchedulerMetrics {
    pub fn record_dispatch(&mut self) {
        self.jobs_dispatched += 1;
    }

    pub fn record_completion(&mut self) {
        self.jobs_completed += 1;
    }

    pub fn record_failure(&mut self) {
        self.jobs_failed += 1;
    }

    pub fn record_retry(&mut self) {
        self.jobs_retried += 1;
    }

    pub fn record_cancellation(&mut self) {
        self.jobs_cancelled += 1;
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
