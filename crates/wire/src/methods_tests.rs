// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn jobs_submit_params_default_runner_is_local_when_omitted() {
    let json = r#"{"name":"j1","input":"crystal input"}"#;
    let params: JobsSubmitParams = serde_json::from_str(json).unwrap();
    assert_eq!(params.runner, RunnerType::Local);
    assert!(params.deps.is_empty());
}

#[test]
fn clusters_create_params_defaults_to_port_22() {
    let json = r#"{"name":"c1","kind":"ssh","host":"login.example.edu"}"#;
    let params: ClustersCreateParams = serde_json::from_str(json).unwrap();
    assert_eq!(params.port, 22);
}

#[test]
fn job_summary_from_job_carries_the_scheduling_fields_not_the_blobs() {
    let job = Job::builder().name("geom-opt").status(JobStatus::Running).build();
    let summary = JobSummary::from(&job);
    assert_eq!(summary.name, "geom-opt");
    assert_eq!(summary.status, JobStatus::Running);
}

#[test]
fn workflows_submit_params_round_trip_through_json() {
    let params = WorkflowsSubmitParams {
        name: "opt-then-freq".to_string(),
        nodes: vec![WorkflowNodeSpec {
            key: "opt".to_string(),
            name: "Geometry optimization".to_string(),
            template_ref: "crystal23/opt".to_string(),
            parameter_template: String::new(),
            dependencies: vec![],
            runner_type: None,
        }],
        policy: Some(cm_core::FailurePolicy::FailFast),
    };
    let json = serde_json::to_string(&params).unwrap();
    let decoded: WorkflowsSubmitParams = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.nodes.len(), 1);
    assert_eq!(decoded.policy, Some(cm_core::FailurePolicy::FailFast));
}
