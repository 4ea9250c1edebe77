// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn create_then_get_round_trips() {
    let store = store();
    let id = store.create_workflow("ceria-bulk-sweep", FailurePolicy::FailFast, 1_000).unwrap();
    let workflow = store.get_workflow(id).unwrap().unwrap();
    assert_eq!(workflow.name, "ceria-bulk-sweep");
    assert_eq!(workflow.status, WorkflowStatus::Pending);
}

#[test]
fn update_workflow_status_unknown_id_is_not_found() {
    let store = store();
    let result = store.update_workflow_status(WorkflowId::new(999), WorkflowStatus::Running);
    assert!(matches!(result, Err(StoreError::NotFound { entity: "Workflow", id: 999 })));
}

#[test]
fn nodes_are_returned_in_creation_order_with_dependencies() {
    let store = store();
    let workflow_id = store.create_workflow("sweep", FailurePolicy::FailFast, 1_000).unwrap();
    let relax = store.create_workflow_node(workflow_id, "relax", "crystal23.relax", "", &[]).unwrap();
    let scf = store.create_workflow_node(workflow_id, "scf", "crystal23.scf", "{{upstream.relax.energy}}", &[relax]).unwrap();

    let nodes = store.get_workflow_nodes(workflow_id).unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].node_id, relax);
    assert_eq!(nodes[1].node_id, scf);
    assert_eq!(nodes[1].dependencies, vec![relax]);
}

#[test]
fn set_node_dependencies_rewrites_edges() {
    let store = store();
    let workflow_id = store.create_workflow("sweep", FailurePolicy::FailFast, 1_000).unwrap();
    let relax = store.create_workflow_node(workflow_id, "relax", "crystal23.relax", "", &[]).unwrap();
    let scf = store.create_workflow_node(workflow_id, "scf", "crystal23.scf", "", &[]).unwrap();

    store.set_node_dependencies(scf, &[relax]).unwrap();
    let nodes = store.get_workflow_nodes(workflow_id).unwrap();
    assert_eq!(nodes[1].dependencies, vec![relax]);
}

#[test]
fn set_node_job_attaches_job_and_marks_queued() {
    let store = store();
    let workflow_id = store.create_workflow("sweep", FailurePolicy::FailFast, 1_000).unwrap();
    let node_id = store.create_workflow_node(workflow_id, "relax", "crystal23.relax", "", &[]).unwrap();
    let job_id = store.create_job(cm_core::JobConfig::builder("relax", "/scratch/relax").build(), 1_000).unwrap();

    store.set_node_job(node_id, job_id).unwrap();
    let node = &store.get_workflow_nodes(workflow_id).unwrap()[0];
    assert_eq!(node.job_id, Some(job_id));
    assert_eq!(node.status, JobStatus::Queued);
}

#[test]
fn update_node_status_stores_results_blob() {
    let store = store();
    let workflow_id = store.create_workflow("sweep", FailurePolicy::FailFast, 1_000).unwrap();
    let node_id = store.create_workflow_node(workflow_id, "relax", "crystal23.relax", "", &[]).unwrap();

    store.update_node_status(node_id, JobStatus::Completed, Some(r#"{"energy": -123.4}"#)).unwrap();
    let node = &store.get_workflow_nodes(workflow_id).unwrap()[0];
    assert_eq!(node.status, JobStatus::Completed);
    assert_eq!(node.results_blob.as_deref(), Some(r#"{"energy": -123.4}"#));
}
