// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use cm_core::{JobConfig, RemoteHandle, ResourceMap};
use cm_engine::orchestrator::Orchestrator;
use cm_engine::queue::QueueManager;
use cm_runners::{LogStream, RunnerResult, RunnerStatus};
use cm_storage::Store;
use parking_lot::Mutex;

use super::*;
use crate::templates::{FileInputGenerator, KeyValueOutputParser};

#[derive(Default)]
struct RecordingRunner {
    submitted: Mutex<Vec<JobId>>,
}

#[async_trait]
impl cm_runners::Runner for RecordingRunner {
    async fn submit(&self, job: &cm_core::Job, _prepared_input: &str) -> RunnerResult<RemoteHandle> {
        self.submitted.lock().push(job.id);
        Ok(RemoteHandle::Pid(job.id.get() as u32))
    }

    async fn poll(&self, _handle: &RemoteHandle) -> RunnerResult<RunnerStatus> {
        Ok(RunnerStatus::Running)
    }

    async fn cancel(&self, _handle: &RemoteHandle) -> RunnerResult<bool> {
        Ok(true)
    }

    async fn retrieve(&self, _handle: &RemoteHandle, _dest_dir: &std::path::Path) -> RunnerResult<()> {
        Ok(())
    }

    async fn stream_logs(&self, _handle: &RemoteHandle) -> RunnerResult<LogStream> {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        Ok(rx)
    }
}

fn test_runtime(runner: Arc<RecordingRunner>) -> Arc<Runtime> {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let queue = Arc::new(QueueManager::new(Arc::clone(&store)).unwrap());
    let generator = Arc::new(FileInputGenerator::new("/tmp"));
    let parser = Arc::new(KeyValueOutputParser::new("output"));
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), Arc::clone(&queue), generator, parser));
    let mut runners: HashMap<RunnerType, std::sync::Arc<dyn cm_runners::Runner>> = HashMap::new();
    runners.insert(RunnerType::Local, runner);
    Arc::new(Runtime::new(store, queue, orchestrator, runners, 4))
}

#[tokio::test]
async fn dequeued_job_is_submitted_and_marked_running() {
    let runner = Arc::new(RecordingRunner::default());
    let runtime = test_runtime(Arc::clone(&runner));

    let work_dir = std::env::temp_dir().join("cm-scheduler-test");
    let config = JobConfig::builder("job-a", work_dir).input_blob("RUN\n").runner_type(RunnerType::Local).build();
    let job_id = runtime.store.create_job(config, 0).unwrap();
    runtime
        .queue
        .enqueue(job_id, cm_core::Priority::default(), &[], RunnerType::Local, None, None, 3, ResourceMap::new())
        .unwrap();

    tick(&runtime).await;

    assert_eq!(runner.submitted.lock().as_slice(), &[job_id]);
    let job = runtime.store.get_job(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(runtime.in_flight_snapshot().len(), 1);
}

#[tokio::test]
async fn no_runner_registered_for_a_runner_type_is_skipped() {
    let runner = Arc::new(RecordingRunner::default());
    let runtime = test_runtime(runner);

    let work_dir = std::env::temp_dir().join("cm-scheduler-test-ssh");
    let config = JobConfig::builder("job-b", work_dir).input_blob("RUN\n").runner_type(RunnerType::Ssh).build();
    let job_id = runtime.store.create_job(config, 0).unwrap();
    runtime
        .queue
        .enqueue(job_id, cm_core::Priority::default(), &[], RunnerType::Ssh, None, None, 3, ResourceMap::new())
        .unwrap();

    // Should not panic even though no SSH runner is registered.
    tick(&runtime).await;
    let job = runtime.store.get_job(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}
