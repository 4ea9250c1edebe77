// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection handling: a read loop that can carry many messages over
//! the connection's lifetime, dispatching each onto the bounded worker
//! pool while writing responses back in the order requests were received.
//!
//! Three tasks share one connection: the read loop (this function's own
//! task), an order-drain task that awaits each request's result in receipt
//! order before handing it to the writer, and a notification-forwarder
//! task that pushes `events.subscribe` topic matches onto the same
//! outbound channel. All three funnel into one writer task so the
//! underlying socket only ever has one writer at a time.

use std::sync::Arc;

use cm_wire::{error_code, read_message_with_limit, write_message, ProtocolError, RpcError, RpcResponse};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::handlers::{self, Subscriptions};
use crate::runtime::Runtime;

pub async fn handle(stream: UnixStream, runtime: Arc<Runtime>) {
    let (mut reader, mut writer) = stream.into_split();
    let subscriptions = Arc::new(Subscriptions::new());
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (order_tx, mut order_rx) = mpsc::unbounded_channel::<oneshot::Receiver<Option<Vec<u8>>>>();

    let writer_task = tokio::spawn(async move {
        while let Some(body) = outbound_rx.recv().await {
            if write_message(&mut writer, &body).await.is_err() {
                break;
            }
        }
    });

    let order_outbound = outbound_tx.clone();
    let order_task = tokio::spawn(async move {
        while let Some(rx) = order_rx.recv().await {
            if let Ok(Some(body)) = rx.await {
                if order_outbound.send(body).is_err() {
                    break;
                }
            }
        }
    });

    let notif_task = spawn_notification_forwarder(Arc::clone(&runtime), Arc::clone(&subscriptions), outbound_tx.clone());

    let max_message_size = crate::config::max_message_size();
    loop {
        tokio::select! {
            _ = runtime.shutdown.cancelled() => break,
            result = read_message_with_limit(&mut reader, max_message_size) => {
                match result {
                    Ok(raw) => {
                        let (tx, rx) = oneshot::channel();
                        if order_tx.send(rx).is_err() {
                            break;
                        }
                        let runtime = Arc::clone(&runtime);
                        let subscriptions = Arc::clone(&subscriptions);
                        tokio::spawn(async move {
                            let body = process_message(&runtime, &subscriptions, raw).await;
                            let _ = tx.send(body);
                        });
                    }
                    Err(ProtocolError::UnexpectedEof) => {
                        debug!("connection closed by peer");
                        break;
                    }
                    Err(err) => {
                        warn!(%err, "framing error, closing connection");
                        break;
                    }
                }
            }
        }
    }

    drop(order_tx);
    drop(outbound_tx);
    let _ = order_task.await;
    let _ = writer_task.await;
    notif_task.abort();
}

fn spawn_notification_forwarder(
    runtime: Arc<Runtime>,
    subscriptions: Arc<Subscriptions>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut notifications = runtime.subscribe();
        loop {
            tokio::select! {
                _ = runtime.shutdown.cancelled() => break,
                received = notifications.recv() => match received {
                    Ok(notification) if subscriptions.wants(&notification.method) => {
                        match serde_json::to_vec(&notification) {
                            Ok(body) => {
                                if outbound.send(body).is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!(%err, "failed to encode notification"),
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notification receiver lagged, dropping backlog");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

/// Parse, dispatch, and encode one request. Returns `None` for
/// notifications (no `id`), which still run but expect no reply.
async fn process_message(runtime: &Arc<Runtime>, subscriptions: &Subscriptions, raw: Vec<u8>) -> Option<Vec<u8>> {
    let request: cm_wire::RpcRequest = match serde_json::from_slice(&raw) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "malformed rpc request");
            return Some(parse_error_body(err));
        }
    };

    let _permit = match runtime.worker_permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return None,
    };
    let result = handlers::dispatch(runtime, subscriptions, &request.method, request.params).await;

    let id = request.id?;
    let response = match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::failure(id, err),
    };
    serde_json::to_vec(&response).ok()
}

fn parse_error_body(err: serde_json::Error) -> Vec<u8> {
    let error = RpcError::new(error_code::PARSE_ERROR, err.to_string());
    let body = serde_json::json!({
        "jsonrpc": cm_wire::JSONRPC_VERSION,
        "id": Value::Null,
        "error": error,
    });
    serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec())
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
