// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::templates::{FileInputGenerator, KeyValueOutputParser};
use cm_core::{ClusterKind, ClusterStatus, RunnerType};
use cm_engine::orchestrator::Orchestrator;
use cm_engine::queue::QueueManager;
use cm_storage::Store;
use cm_wire::error_code;
use std::collections::HashMap;

fn test_runtime() -> Arc<Runtime> {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let queue = Arc::new(QueueManager::new(Arc::clone(&store)).unwrap());
    let generator = Arc::new(FileInputGenerator::new("/tmp"));
    let parser = Arc::new(KeyValueOutputParser::new("output"));
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), Arc::clone(&queue), generator, parser));
    Arc::new(Runtime::new(store, queue, orchestrator, HashMap::new(), 4))
}

fn submit_params(name: &str) -> JobsSubmitParams {
    JobsSubmitParams {
        name: name.to_string(),
        input: "RUN A\n".to_string(),
        runner: RunnerType::Local,
        cluster_id: None,
        parallelism: None,
        priority: None,
        deps: Vec::new(),
    }
}

#[tokio::test]
async fn ping_and_version_round_trip() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();

    let pong = dispatch(&runtime, &subs, "system.ping", serde_json::json!({})).await.unwrap();
    let parsed: PingResult = serde_json::from_value(pong).unwrap();
    assert!(parsed.pong);

    let version = dispatch(&runtime, &subs, "system.version", serde_json::json!({})).await.unwrap();
    let parsed: VersionResult = serde_json::from_value(version).unwrap();
    assert_eq!(parsed.server, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_method_is_reported_as_method_not_found() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();
    let err = dispatch(&runtime, &subs, "nonexistent.method", serde_json::json!({})).await.unwrap_err();
    assert_eq!(err.code, error_code::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn malformed_params_are_reported_as_invalid_params() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();
    let err = dispatch(&runtime, &subs, "jobs.get", serde_json::json!({"wrong": "shape"})).await.unwrap_err();
    assert_eq!(err.code, error_code::INVALID_PARAMS);
}

#[tokio::test]
async fn submitted_job_appears_in_jobs_list_and_jobs_get() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();

    let result = dispatch(&runtime, &subs, "jobs.submit", serde_json::to_value(submit_params("j1")).unwrap())
        .await
        .unwrap();
    let submitted: JobsSubmitResult = serde_json::from_value(result).unwrap();

    let listed = dispatch(&runtime, &subs, "jobs.list", serde_json::json!({})).await.unwrap();
    let listed: Vec<JobSummary> = serde_json::from_value(listed).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, submitted.id);

    let got = dispatch(&runtime, &subs, "jobs.get", serde_json::json!({"id": submitted.id})).await.unwrap();
    let got: JobSummary = serde_json::from_value(got).unwrap();
    assert_eq!(got.name, "j1");
}

#[tokio::test]
async fn jobs_get_on_unknown_id_is_invalid_params() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();
    let err = dispatch(&runtime, &subs, "jobs.get", serde_json::json!({"id": 999})).await.unwrap_err();
    assert_eq!(err.code, error_code::INVALID_PARAMS);
}

#[tokio::test]
async fn cluster_create_list_delete_round_trip() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();

    let created = dispatch(
        &runtime,
        &subs,
        "clusters.create",
        serde_json::json!({"name": "login-1", "kind": "ssh", "host": "login.example.edu"}),
    )
    .await
    .unwrap();
    let created: ClusterSummary = serde_json::from_value(created).unwrap();
    assert_eq!(created.kind, ClusterKind::Ssh);

    let listed = dispatch(&runtime, &subs, "clusters.list", serde_json::json!({})).await.unwrap();
    let listed: Vec<ClusterSummary> = serde_json::from_value(listed).unwrap();
    assert_eq!(listed.len(), 1);

    let deleted =
        dispatch(&runtime, &subs, "clusters.delete", serde_json::json!({"id": created.id})).await.unwrap();
    let deleted: ClustersDeleteResult = serde_json::from_value(deleted).unwrap();
    assert!(deleted.deleted);
}

#[tokio::test]
async fn cluster_update_applies_status_and_rejects_unsupported_fields() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();

    let created = dispatch(
        &runtime,
        &subs,
        "clusters.create",
        serde_json::json!({"name": "login-1", "kind": "ssh", "host": "login.example.edu"}),
    )
    .await
    .unwrap();
    let created: ClusterSummary = serde_json::from_value(created).unwrap();

    let updated = dispatch(
        &runtime,
        &subs,
        "clusters.update",
        serde_json::json!({"id": created.id, "status": "inactive"}),
    )
    .await
    .unwrap();
    let updated: ClusterSummary = serde_json::from_value(updated).unwrap();
    assert_eq!(updated.status, ClusterStatus::Inactive);

    let err = dispatch(
        &runtime,
        &subs,
        "clusters.update",
        serde_json::json!({"id": created.id, "max_concurrent": 4}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, error_code::INVALID_PARAMS);
}

#[tokio::test]
async fn workflow_submit_and_get_round_trip() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();

    let params = serde_json::json!({
        "name": "wf1",
        "nodes": [{"key": "a", "name": "step-a", "template_ref": "a.tmpl"}],
    });
    let submitted = dispatch(&runtime, &subs, "workflows.submit", params).await.unwrap();
    let submitted: WorkflowsSubmitResult = serde_json::from_value(submitted).unwrap();

    let got = dispatch(&runtime, &subs, "workflows.get", serde_json::json!({"id": submitted.id})).await.unwrap();
    let got: WorkflowDetail = serde_json::from_value(got).unwrap();
    assert_eq!(got.nodes.len(), 1);
}

#[tokio::test]
async fn events_subscribe_rejects_unknown_topics_and_records_known_ones() {
    let runtime = test_runtime();
    let subs = Subscriptions::new();

    let err = dispatch(&runtime, &subs, "events.subscribe", serde_json::json!({"topics": ["bogus"]}))
        .await
        .unwrap_err();
    assert_eq!(err.code, error_code::INVALID_PARAMS);
    assert!(!subs.wants(cm_wire::topics::JOB_STATUS_CHANGED));

    dispatch(
        &runtime,
        &subs,
        "events.subscribe",
        serde_json::json!({"topics": [cm_wire::topics::JOB_STATUS_CHANGED]}),
    )
    .await
    .unwrap();
    assert!(subs.wants(cm_wire::topics::JOB_STATUS_CHANGED));
}
