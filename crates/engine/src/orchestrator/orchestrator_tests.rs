// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cm_core::{FailurePolicy, JobStatus, WorkflowNodeSpec, WorkflowSpec, WorkflowStatus};
use cm_storage::Store;
use tempfile::tempdir;

use super::*;
use crate::generator::GeneratorError;
use crate::parser::ParseError;
use crate::queue::QueueManager;

struct EchoGenerator;

impl InputGenerator for EchoGenerator {
    fn generate(&self, template_ref: &str, resolved_parameters: &str) -> Result<String, GeneratorError> {
        Ok(format!("{template_ref}:{resolved_parameters}"))
    }
}

/// Always reports a fixed `energy` key, regardless of `work_dir`.
struct FixedEnergyParser(f64);

impl OutputParser for FixedEnergyParser {
    fn parse(&self, _work_dir: &Path) -> Result<HashMap<String, String>, ParseError> {
        let mut results = HashMap::new();
        results.insert("energy".to_string(), self.0.to_string());
        Ok(results)
    }
}

struct FailingParser;

impl OutputParser for FailingParser {
    fn parse(&self, _work_dir: &Path) -> Result<HashMap<String, String>, ParseError> {
        Err(ParseError("no output file".to_string()))
    }
}

fn orchestrator(parser: impl OutputParser + 'static) -> (Arc<Orchestrator>, Arc<Store>, Arc<QueueManager>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let queue = Arc::new(QueueManager::new(Arc::clone(&store)).unwrap());
    let scratch = tempdir().unwrap();
    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&store), Arc::clone(&queue), Arc::new(EchoGenerator), Arc::new(parser))
            .with_scratch_base(scratch.path().to_string_lossy().to_string()),
    );
    // keep the tempdir alive for the duration of the test by leaking it;
    // these are short-lived in-process tests, not long-running daemons.
    std::mem::forget(scratch);
    (orchestrator, store, queue)
}

fn run_to_completion(store: &Store, queue: &QueueManager) {
    loop {
        let Some(job_id) = queue.dequeue(cm_core::RunnerType::Local).unwrap() else { break };
        store.update_job_status(job_id, JobStatus::Completed, None, Some(1)).unwrap();
        queue.handle_job_completion(job_id, JobStatus::Completed).unwrap();
    }
}

#[test]
fn rejects_workflow_with_duplicate_keys() {
    let (orchestrator, _store, _queue) = orchestrator(FixedEnergyParser(0.0));
    let spec = WorkflowSpec {
        name: "dup".to_string(),
        nodes: vec![
            WorkflowNodeSpec { key: "a".into(), name: "a".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
            WorkflowNodeSpec { key: "a".into(), name: "a2".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
        ],
        failure_policy: None,
    };
    let err = orchestrator.submit_workflow(spec).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidWorkflow(_)));
}

#[test]
fn rejects_workflow_with_unknown_dependency_key() {
    let (orchestrator, _store, _queue) = orchestrator(FixedEnergyParser(0.0));
    let spec = WorkflowSpec {
        name: "dangling".to_string(),
        nodes: vec![WorkflowNodeSpec {
            key: "a".into(),
            name: "a".into(),
            template_ref: "t".into(),
            parameter_template: String::new(),
            dependencies: vec!["missing".into()],
            runner_type: None,
        }],
        failure_policy: None,
    };
    let err = orchestrator.submit_workflow(spec).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidWorkflow(_)));
}

#[test]
fn rejects_workflow_with_a_dependency_cycle() {
    let (orchestrator, _store, _queue) = orchestrator(FixedEnergyParser(0.0));
    let spec = WorkflowSpec {
        name: "cycle".to_string(),
        nodes: vec![
            WorkflowNodeSpec { key: "a".into(), name: "a".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec!["b".into()], runner_type: None },
            WorkflowNodeSpec { key: "b".into(), name: "b".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec!["a".into()], runner_type: None },
        ],
        failure_policy: None,
    };
    let err = orchestrator.submit_workflow(spec).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidWorkflow(_)));
}

#[test]
fn zero_dependency_node_is_submitted_immediately() {
    let (orchestrator, store, queue) = orchestrator(FixedEnergyParser(0.0));
    let spec = WorkflowSpec {
        name: "single".to_string(),
        nodes: vec![WorkflowNodeSpec {
            key: "relax".into(),
            name: "relax".into(),
            template_ref: "crystal23.relax".into(),
            parameter_template: String::new(),
            dependencies: vec![],
            runner_type: None,
        }],
        failure_policy: None,
    };
    let workflow_id = orchestrator.submit_workflow(spec).unwrap();

    let view = orchestrator.get_workflow(workflow_id).unwrap();
    assert_eq!(view.nodes[0].status, JobStatus::Queued);
    assert!(view.nodes[0].job_id.is_some());

    assert!(queue.dequeue(cm_core::RunnerType::Local).unwrap().is_some());
    let _ = store;
}

#[test]
fn downstream_node_waits_for_upstream_result_then_completes_workflow() {
    let (orchestrator, store, queue) = orchestrator(FixedEnergyParser(-42.0));
    let spec = WorkflowSpec {
        name: "chain".to_string(),
        nodes: vec![
            WorkflowNodeSpec { key: "relax".into(), name: "relax".into(), template_ref: "crystal23.relax".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
            WorkflowNodeSpec {
                key: "scf".into(),
                name: "scf".into(),
                template_ref: "crystal23.scf".into(),
                parameter_template: "seed={{upstream.relax.energy}}".into(),
                dependencies: vec!["relax".into()],
                runner_type: None,
            },
        ],
        failure_policy: None,
    };
    let workflow_id = orchestrator.submit_workflow(spec).unwrap();

    // scf isn't submittable yet: relax hasn't completed.
    let view = orchestrator.get_workflow(workflow_id).unwrap();
    assert_eq!(view.nodes[1].status, JobStatus::Pending);

    run_to_completion(&store, &queue);

    let view = orchestrator.get_workflow(workflow_id).unwrap();
    assert!(view.nodes.iter().all(|n| n.status == JobStatus::Completed));
    assert_eq!(view.workflow.status, WorkflowStatus::Completed);
}

#[test]
fn fail_fast_cancels_sibling_nodes_on_failure() {
    let (orchestrator, store, queue) = orchestrator(FailingParser);
    let spec = WorkflowSpec {
        name: "failfast".to_string(),
        nodes: vec![
            WorkflowNodeSpec { key: "a".into(), name: "a".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
            WorkflowNodeSpec { key: "b".into(), name: "b".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
        ],
        failure_policy: Some(FailurePolicy::FailFast),
    };
    let workflow_id = orchestrator.submit_workflow(spec).unwrap();

    // Dequeue and complete only one job; its parse failure should trip FailFast.
    let job_id = queue.dequeue(cm_core::RunnerType::Local).unwrap().unwrap();
    store.update_job_status(job_id, JobStatus::Completed, None, Some(1)).unwrap();
    queue.handle_job_completion(job_id, JobStatus::Completed).unwrap();

    let view = orchestrator.get_workflow(workflow_id).unwrap();
    assert_eq!(view.workflow.status, WorkflowStatus::Failed);
    assert!(view.nodes.iter().all(|n| n.status.is_terminal()));
}

#[test]
fn continue_on_failure_lets_independent_branch_finish() {
    let (orchestrator, store, queue) = orchestrator(FixedEnergyParser(1.0));
    let spec = WorkflowSpec {
        name: "continue".to_string(),
        nodes: vec![
            WorkflowNodeSpec { key: "a".into(), name: "a".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
            WorkflowNodeSpec { key: "b".into(), name: "b".into(), template_ref: "t".into(), parameter_template: String::new(), dependencies: vec![], runner_type: None },
        ],
        failure_policy: Some(FailurePolicy::ContinueOnFailure),
    };
    let workflow_id = orchestrator.submit_workflow(spec).unwrap();

    // Fail the first job directly (bypassing the parser) to isolate the policy.
    let job_id = queue.dequeue(cm_core::RunnerType::Local).unwrap().unwrap();
    store.update_job_status(job_id, JobStatus::Failed, None, Some(1)).unwrap();
    queue.handle_job_completion(job_id, JobStatus::Failed).unwrap();

    run_to_completion(&store, &queue);

    let view = orchestrator.get_workflow(workflow_id).unwrap();
    assert_eq!(view.workflow.status, WorkflowStatus::Failed);
    let statuses: Vec<_> = view.nodes.iter().map(|n| n.status).collect();
    assert!(statuses.contains(&JobStatus::Failed));
    assert!(statuses.contains(&JobStatus::Completed));
}

#[test]
fn cancel_marks_non_terminal_nodes_and_workflow_cancelled() {
    let (orchestrator, _store, _queue) = orchestrator(FixedEnergyParser(0.0));
    let spec = WorkflowSpec {
        name: "cancel-me".to_string(),
        nodes: vec![WorkflowNodeSpec {
            key: "a".into(),
            name: "a".into(),
            template_ref: "t".into(),
            parameter_template: String::new(),
            dependencies: vec![],
            runner_type: None,
        }],
        failure_policy: None,
    };
    let workflow_id = orchestrator.submit_workflow(spec).unwrap();
    orchestrator.cancel(workflow_id).unwrap();

    let view = orchestrator.get_workflow(workflow_id).unwrap();
    assert_eq!(view.workflow.status, WorkflowStatus::Cancelled);
    assert_eq!(view.nodes[0].status, JobStatus::Cancelled);
}
