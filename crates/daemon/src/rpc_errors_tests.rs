// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cm_core::JobId;

#[test]
fn queue_circular_dependency_uses_the_queue_error_code() {
    let rpc = queue_error(QueueError::CircularDependency(JobId::new(1)));
    assert_eq!(rpc.code, error_code::QUEUE);
}

#[test]
fn queue_store_errors_are_reclassified_as_store_errors() {
    let rpc = queue_error(QueueError::Store(StoreError::NotFound { entity: "Job", id: 1 }));
    assert_eq!(rpc.code, error_code::STORE);
}

#[test]
fn workflow_errors_bubble_through_nested_runner_classification() {
    let rpc = workflow_error(WorkflowError::Runner(RunnerError::Scheduler("sbatch failed".into())));
    assert_eq!(rpc.code, error_code::SLURM);
}

#[test]
fn runner_transport_failures_use_the_transport_code() {
    let rpc = runner_error(RunnerError::Transport("connection reset".into()));
    assert_eq!(rpc.code, error_code::TRANSPORT);
}
