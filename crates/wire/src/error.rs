// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing-level failures, distinct from JSON-RPC domain errors
//! ([`crate::rpc::RpcError`]), which travel inside a well-formed message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message header has no Content-Length")]
    MissingContentLength,

    #[error("invalid Content-Length header: {0:?}")]
    InvalidContentLength(String),

    #[error("message of {size} bytes exceeds the {max}-byte limit")]
    MessageTooLarge { size: usize, max: usize },

    /// The peer closed the connection, cleanly or mid-message. Not a
    /// protocol violation: callers should end their read loop quietly
    /// rather than report this as an error.
    #[error("connection closed before a full message was read")]
    UnexpectedEof,

    #[error("message body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
