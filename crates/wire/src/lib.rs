// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication.
//!
//! Wire format: `Content-Length: <decimal>\r\n\r\n<body>`, one JSON-RPC 2.0
//! envelope per body.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod framing;
mod methods;
mod rpc;

pub use error::ProtocolError;
pub use framing::{read_message, read_message_with_limit, write_message, DEFAULT_MAX_MESSAGE_SIZE};
pub use methods::{
    ClustersCreateParams, ClustersDeleteParams, ClustersDeleteResult, ClustersGetParams,
    ClustersTestParams, ClustersTestResult, ClustersUpdateParams, ClusterSummary,
    EventsSubscribeParams, JobDependencyParam, JobStatusChanged, JobSummary, JobsCancelParams,
    JobsCancelResult, JobsGetParams, JobsListParams, JobsLogParams, JobsLogResult,
    JobsSubmitParams, JobsSubmitResult, PingResult, VersionResult, WorkflowCompleted,
    WorkflowDetail, WorkflowFailed, WorkflowNodeCompleted, WorkflowNodeStarted,
    WorkflowsCancelParams, WorkflowsCancelResult, WorkflowsGetParams, WorkflowsSubmitParams,
    WorkflowsSubmitResult,
};
pub use rpc::{error_code, topics, JSONRPC_VERSION, RequestId, RpcError, RpcNotification, RpcRequest, RpcResponse};
