// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the Queue Manager and Workflow Orchestrator.

use cm_core::JobId;
use cm_runners::RunnerError;
use cm_storage::StoreError;
use thiserror::Error;

use crate::generator::GeneratorError;
use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job {0} is not known to the store")]
    InvalidJob(JobId),

    #[error("enqueuing job {0} with the given dependencies would create a cycle")]
    CircularDependency(JobId),

    #[error("job {0} already has a registered completion callback")]
    CallbackAlreadyRegistered(JobId),

    #[error("job {0} is not currently queued")]
    NotQueued(JobId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow is invalid: {0}")]
    InvalidWorkflow(String),

    #[error("workflow {0} is not known to the store")]
    NotFound(cm_core::WorkflowId),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Parser(#[from] ParseError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
