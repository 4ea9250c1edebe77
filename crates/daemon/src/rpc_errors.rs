// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps each crate's own error type into the `{code, message, data}` shape
//! `cm_wire::RpcError` carries, at this dispatch boundary — one function
//! per error type, rather than threading a single mega-enum through every
//! crate (see the error taxonomy note in the workspace design notes).

use cm_engine::{QueueError, WorkflowError};
use cm_runners::RunnerError;
use cm_storage::StoreError;
use cm_wire::{error_code, RpcError};

pub fn store_error(err: StoreError) -> RpcError {
    RpcError::new(error_code::STORE, err.to_string())
}

pub fn queue_error(err: QueueError) -> RpcError {
    match err {
        QueueError::Store(err) => store_error(err),
        other => RpcError::new(error_code::QUEUE, other.to_string()),
    }
}

pub fn workflow_error(err: WorkflowError) -> RpcError {
    match err {
        WorkflowError::Store(err) => store_error(err),
        WorkflowError::Queue(err) => queue_error(err),
        WorkflowError::Runner(err) => runner_error(err),
        other => RpcError::new(error_code::WORKFLOW, other.to_string()),
    }
}

pub fn runner_error(err: RunnerError) -> RpcError {
    match err {
        RunnerError::Scheduler(_) => RpcError::new(error_code::SLURM, err.to_string()),
        _ => RpcError::new(error_code::TRANSPORT, err.to_string()),
    }
}

#[cfg(test)]
#[path = "rpc_errors_tests.rs"]
mod tests;
