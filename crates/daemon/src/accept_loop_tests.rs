// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

use cm_engine::orchestrator::Orchestrator;
use cm_engine::queue::QueueManager;
use cm_storage::Store;
use cm_wire::{read_message, write_message, RequestId, RpcRequest, RpcResponse};
use tokio::net::UnixStream;

use super::*;
use crate::templates::{FileInputGenerator, KeyValueOutputParser};

fn test_runtime() -> Arc<Runtime> {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let queue = Arc::new(QueueManager::new(Arc::clone(&store)).unwrap());
    let generator = Arc::new(FileInputGenerator::new("/tmp"));
    let parser = Arc::new(KeyValueOutputParser::new("output"));
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), Arc::clone(&queue), generator, parser));
    Arc::new(Runtime::new(store, queue, orchestrator, HashMap::new(), 4))
}

#[tokio::test]
async fn accepted_connections_answer_rpc_requests() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crystalmath.sock");
    let listener = crate::socket::bind(&path).await.unwrap();
    let runtime = test_runtime();

    let accept_task = tokio::spawn(run(listener, Arc::clone(&runtime)));

    let mut client = UnixStream::connect(&path).await.unwrap();
    let request = RpcRequest::call(RequestId::Number(1), "system.ping", serde_json::json!({}));
    write_message(&mut client, &serde_json::to_vec(&request).unwrap()).await.unwrap();
    let reply = read_message(&mut client).await.unwrap();
    let reply: RpcResponse = serde_json::from_slice(&reply).unwrap();
    assert!(reply.error.is_none());

    drop(client);
    runtime.shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(1), accept_task).await;
}
