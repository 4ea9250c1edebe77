// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn priority_clamps_to_valid_range() {
    assert_eq!(Priority::new(9).get(), 4);
    assert_eq!(Priority::new(0).get(), 0);
    assert_eq!(Priority::default().get(), DEFAULT_PRIORITY);
}

#[test]
fn priority_ordering_zero_is_highest() {
    assert!(Priority::HIGHEST < Priority::LOWEST);
    assert!(Priority::new(1) < Priority::new(2));
}

#[test]
fn new_queued_state_has_default_retry_budget() {
    let state = QueuedJobState::new(JobId::new(1), RunnerType::Local, 1_000);
    assert_eq!(state.retry_count, 0);
    assert_eq!(state.max_retries, DEFAULT_MAX_RETRIES);
    assert!(state.has_retry_budget());
}

#[test]
fn retry_budget_exhausted_at_max_retries() {
    let mut state = QueuedJobState::new(JobId::new(1), RunnerType::Local, 1_000);
    state.retry_count = state.max_retries;
    assert!(!state.has_retry_budget());
}
