// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by runners.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn local process: {0}")]
    Spawn(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("handle {0} is not recognized by this runner")]
    UnknownHandle(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rejected input: {0}")]
    InvalidInput(String),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
