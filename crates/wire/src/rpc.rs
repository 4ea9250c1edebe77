// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 envelope types carried inside each framed message. Method
//! dispatch, and the per-method param/result shapes, live in
//! [`crate::methods`]; this module only knows about the envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes, plus this system's domain range.
pub mod error_code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Not part of the JSON-RPC 2.0 base range; this system's own
    /// convention for a request that exceeded its configured timeout.
    pub const TIMEOUT: i64 = -32000;

    pub const STORE: i64 = -32001;
    pub const TRANSPORT: i64 = -32002;
    pub const SLURM: i64 = -32003;
    pub const WORKFLOW: i64 = -32004;
    pub const QUEUE: i64 = -32005;
}

/// Either a numeric or string request id. `None` on the envelope as a whole
/// marks a notification (no reply expected).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// An inbound JSON-RPC call or notification. `id` is `None` for
/// notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn call(id: RequestId, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id: Some(id), method: method.into(), params }
    }

    pub fn notification(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id: None, method: method.into(), params }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A domain or protocol error, carried in [`RpcResponse::error`].
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(error_code::METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::new(error_code::INVALID_PARAMS, reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(error_code::INTERNAL_ERROR, reason.into())
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::new(error_code::TIMEOUT, reason.into())
    }
}

/// A reply to an [`RpcRequest`] that carried an id. Exactly one of `result`
/// / `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: RequestId, error: RpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error) }
    }
}

/// A server-to-client notification: `job.statusChanged`,
/// `workflow.nodeStarted`, `workflow.nodeCompleted`, `workflow.completed`,
/// `workflow.failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcNotification {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), method: method.into(), params }
    }
}

/// Names of the notification topics `events.subscribe` accepts.
pub mod topics {
    pub const JOB_STATUS_CHANGED: &str = "job.statusChanged";
    pub const WORKFLOW_NODE_STARTED: &str = "workflow.nodeStarted";
    pub const WORKFLOW_NODE_COMPLETED: &str = "workflow.nodeCompleted";
    pub const WORKFLOW_COMPLETED: &str = "workflow.completed";
    pub const WORKFLOW_FAILED: &str = "workflow.failed";

    pub const ALL: &[&str] = &[
        JOB_STATUS_CHANGED,
        WORKFLOW_NODE_STARTED,
        WORKFLOW_NODE_COMPLETED,
        WORKFLOW_COMPLETED,
        WORKFLOW_FAILED,
    ];
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
