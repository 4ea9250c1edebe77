// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner-watch loop: polls every in-flight job's backend for a terminal
//! status, retrieves artifacts, and feeds the result back into the store
//! and Queue Manager. Workflow bookkeeping (node/workflow status, result
//! parsing) happens inside the Queue Manager's completion callback, which
//! [`cm_engine::orchestrator::Orchestrator`] registers for every node job
//! it enqueues; this loop only notices the job ended and reports it.

use std::sync::Arc;

use cm_core::{Job, JobId, JobStatus, WorkflowStatus};
use cm_runners::RunnerStatus;
use tracing::{error, info, warn};

use crate::runtime::Runtime;

pub async fn run(runtime: Arc<Runtime>) {
    info!("runner-watch loop started");
    loop {
        tokio::select! {
            _ = runtime.shutdown.cancelled() => {
                info!("runner-watch loop shutting down");
                break;
            }
            _ = tokio::time::sleep(crate::config::poll_interval()) => {
                tick(&runtime).await;
            }
        }
    }
}

async fn tick(runtime: &Arc<Runtime>) {
    for (job_id, runner_type, handle) in runtime.in_flight_snapshot() {
        let Some(runner) = runtime.runner(runner_type) else {
            warn!(job_id = %job_id, ?runner_type, "no runner registered for in-flight job");
            continue;
        };

        let status = match runner.poll(&handle).await {
            Ok(status) => status,
            Err(err) => {
                error!(%err, job_id = %job_id, "poll failed");
                continue;
            }
        };
        if !status.is_terminal() {
            continue;
        }

        let Some(job) = load_job(runtime, job_id) else { continue };
        if let Err(err) = runner.retrieve(&handle, job.execution_dir()).await {
            warn!(%err, job_id = %job_id, "failed to retrieve artifacts");
        }

        let (new_status, exit_code) = terminal_status(&status);
        let now = now_ms();
        if let Err(err) = runtime.store.update_job_status(job_id, new_status, exit_code, Some(now)) {
            error!(%err, job_id = %job_id, "failed to record terminal job status");
        }
        if let Err(err) = runtime.queue.handle_job_completion(job_id, new_status) {
            error!(%err, job_id = %job_id, "failed to report completion to queue");
        }
        runtime.forget_in_flight(job_id);
        record_metric(runtime, new_status);
        publish_completion(runtime, &job, new_status);
    }
}

fn load_job(runtime: &Runtime, job_id: JobId) -> Option<Job> {
    match runtime.store.get_job(job_id) {
        Ok(Some(job)) => Some(job),
        Ok(None) => {
            warn!(job_id = %job_id, "in-flight job missing from store");
            None
        }
        Err(err) => {
            error!(%err, job_id = %job_id, "failed to load in-flight job");
            None
        }
    }
}

fn terminal_status(status: &RunnerStatus) -> (JobStatus, Option<i32>) {
    match status {
        RunnerStatus::Completed { exit_code, .. } => (JobStatus::Completed, Some(*exit_code)),
        RunnerStatus::Failed { .. } => (JobStatus::Failed, None),
        RunnerStatus::Cancelled => (JobStatus::Cancelled, None),
        RunnerStatus::Queued | RunnerStatus::Running => unreachable!("caller already checked is_terminal"),
    }
}

fn record_metric(runtime: &Runtime, status: JobStatus) {
    runtime.with_metrics(|metrics| match status {
        JobStatus::Completed => metrics.record_completion(),
        JobStatus::Failed | JobStatus::Cancelled => metrics.record_failure(),
        _ => {}
    });
}

fn publish_completion(runtime: &Runtime, job: &Job, status: JobStatus) {
    runtime.publish(cm_wire::RpcNotification::new(
        cm_wire::topics::JOB_STATUS_CHANGED,
        serde_json::json!(cm_wire::JobStatusChanged { job_id: job.id, status }),
    ));

    let (Some(workflow_id), Some(node_id)) = (job.parent_workflow, job.parent_node) else { return };
    runtime.publish(cm_wire::RpcNotification::new(
        cm_wire::topics::WORKFLOW_NODE_COMPLETED,
        serde_json::json!(cm_wire::WorkflowNodeCompleted { workflow_id, node_id, status }),
    ));

    match runtime.store.get_workflow(workflow_id) {
        Ok(Some(workflow)) if workflow.status.is_terminal() => {
            let topic = match workflow.status {
                WorkflowStatus::Completed => cm_wire::topics::WORKFLOW_COMPLETED,
                _ => cm_wire::topics::WORKFLOW_FAILED,
            };
            let payload = match workflow.status {
                WorkflowStatus::Completed => {
                    serde_json::json!(cm_wire::WorkflowCompleted { workflow_id, status: workflow.status })
                }
                _ => serde_json::json!(cm_wire::WorkflowFailed { workflow_id, reason: None }),
            };
            runtime.publish(cm_wire::RpcNotification::new(topic, payload));
        }
        Ok(_) => {}
        Err(err) => error!(%err, workflow_id = %workflow_id, "failed to load workflow after node completion"),
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
