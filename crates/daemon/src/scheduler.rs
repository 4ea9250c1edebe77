// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling loop: once per tick, asks the Queue Manager for the next
//! ready job on each runner backend and hands it to that backend's
//! `submit`. Dispatch itself (reading the job's prepared input and
//! launching the process/SSH session/`sbatch` invocation) happens inside
//! the runner; this loop only moves jobs from "queued" to "in flight".

use std::sync::Arc;

use cm_core::{JobId, JobStatus, RunnerType};
use tracing::{error, info, warn};

use crate::runtime::Runtime;

const RUNNER_TYPES: [RunnerType; 3] = [RunnerType::Local, RunnerType::Ssh, RunnerType::Slurm];

pub async fn run(runtime: Arc<Runtime>) {
    info!("scheduler loop started");
    loop {
        tokio::select! {
            _ = runtime.shutdown.cancelled() => {
                info!("scheduler loop shutting down");
                break;
            }
            _ = runtime.queue.wait_for_tick(crate::config::scheduling_interval()) => {
                tick(&runtime).await;
            }
        }
    }
}

async fn tick(runtime: &Arc<Runtime>) {
    for runner_type in RUNNER_TYPES {
        let Some(runner) = runtime.runner(runner_type) else { continue };
        loop {
            let job_id = match runtime.queue.dequeue(runner_type) {
                Ok(Some(job_id)) => job_id,
                Ok(None) => break,
                Err(err) => {
                    error!(%err, ?runner_type, "failed to dequeue");
                    break;
                }
            };
            dispatch_one(runtime, runner.as_ref(), job_id).await;
        }
    }
    runtime.persist_metrics();
}

async fn dispatch_one(runtime: &Arc<Runtime>, runner: &dyn cm_runners::Runner, job_id: JobId) {
    let job = match runtime.store.get_job(job_id) {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(job_id = %job_id, "dequeued job missing from store");
            return;
        }
        Err(err) => {
            error!(%err, job_id = %job_id, "failed to load dequeued job");
            return;
        }
    };

    match runner.submit(&job, &job.input_blob).await {
        Ok(handle) => {
            if let Err(err) = runtime.store.update_job_status(job_id, JobStatus::Running, None, None) {
                error!(%err, job_id = %job_id, "failed to record job as running");
            }
            runtime.track_in_flight(job_id, job.runner_type, handle);
            runtime.with_metrics(|metrics| metrics.record_dispatch());
            runtime.publish(cm_wire::RpcNotification::new(
                cm_wire::topics::JOB_STATUS_CHANGED,
                serde_json::json!(cm_wire::JobStatusChanged { job_id, status: JobStatus::Running }),
            ));
        }
        Err(err) => {
            warn!(%err, job_id = %job_id, "submit failed, marking job failed");
            let now = now_ms();
            if let Err(err) = runtime.store.update_job_status(job_id, JobStatus::Failed, None, Some(now)) {
                error!(%err, job_id = %job_id, "failed to record submit failure");
            }
            if let Err(err) = runtime.queue.handle_job_completion(job_id, JobStatus::Failed) {
                error!(%err, job_id = %job_id, "failed to report submit failure to queue");
            }
            runtime.with_metrics(|metrics| metrics.record_failure());
            runtime.publish(cm_wire::RpcNotification::new(
                cm_wire::topics::JOB_STATUS_CHANGED,
                serde_json::json!(cm_wire::JobStatusChanged { job_id, status: JobStatus::Failed }),
            ));
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
