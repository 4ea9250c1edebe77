// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_node_is_pending_with_no_dependencies() {
    let node = WorkflowNode::new(NodeId::new(1), WorkflowId::new(1), "relax", "crystal23.relax");
    assert_eq!(node.status, JobStatus::Pending);
    assert!(node.dependencies.is_empty());
    assert!(node.job_id.is_none());
}

#[test]
fn dependencies_satisfied_requires_all_upstream_keys() {
    let node = WorkflowNode::new(NodeId::new(3), WorkflowId::new(1), "scf", "crystal23.scf")
        .dependencies(vec![NodeId::new(1), NodeId::new(2)]);

    assert!(!node.dependencies_satisfied(&[NodeId::new(1)]));
    assert!(node.dependencies_satisfied(&[NodeId::new(1), NodeId::new(2)]));
}

#[test]
fn workflow_node_spec_deserializes_with_defaults() {
    let json = r#"{"key":"relax","name":"relax","template_ref":"crystal23.relax"}"#;
    let spec: WorkflowNodeSpec = serde_json::from_str(json).unwrap();
    assert!(spec.dependencies.is_empty());
    assert_eq!(spec.parameter_template, "");
    assert!(spec.runner_type.is_none());
}

#[test]
fn workflow_spec_deserializes_node_list() {
    let json = r#"{
        "name": "bulk-sweep",
        "nodes": [
            {"key": "relax", "name": "relax", "template_ref": "crystal23.relax"},
            {"key": "scf", "name": "scf", "template_ref": "crystal23.scf", "dependencies": ["relax"]}
        ]
    }"#;
    let spec: WorkflowSpec = serde_json::from_str(json).unwrap();
    assert_eq!(spec.nodes.len(), 2);
    assert_eq!(spec.nodes[1].dependencies, vec!["relax".to_string()]);
    assert!(spec.failure_policy.is_none());
}
