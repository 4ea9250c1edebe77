// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fresh_metrics_are_all_zero() {
    let metrics = SchedulerMetrics::default();
    assert_eq!(metrics.jobs_dispatched, 0);
    assert_eq!(metrics.jobs_completed, 0);
}

#[test]
fn record_methods_increment_their_own_counter_only() {
    let mut metrics = SchedulerMetrics::default();
    metrics.record_dispatch();
    metrics.record_completion();
    metrics.record_failure();
    metrics.record_retry();
    metrics.record_cancellation();

    assert_eq!(metrics.jobs_dispatched, 1);
    assert_eq!(metrics.jobs_completed, 1);
    assert_eq!(metrics.jobs_failed, 1);
    assert_eq!(metrics.jobs_retried, 1);
    assert_eq!(metrics.jobs_cancelled, 1);
    assert_eq!(metrics.queue_depth, 0);
}
