// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn remote_handle_display() {
    assert_eq!(RemoteHandle::Pid(123).to_string(), "123");
    assert_eq!(RemoteHandle::SlurmJobId("98765".to_string()).to_string(), "98765");
}

#[test]
fn remote_job_builder_sets_paths() {
    let job = RemoteJob::new(JobId::new(1), ClusterId::new(1), RemoteHandle::Pid(42), "/scratch/job-1")
        .stdout_path("/scratch/job-1/stdout.log")
        .stderr_path("/scratch/job-1/stderr.log");

    assert_eq!(job.stdout_path.as_deref(), Some("/scratch/job-1/stdout.log"));
    assert_eq!(job.stderr_path.as_deref(), Some("/scratch/job-1/stderr.log"));
    assert_eq!(job.remote_work_dir, "/scratch/job-1");
}

#[test]
fn remote_job_serde_round_trip() {
    let job = RemoteJob::new(JobId::new(2), ClusterId::new(3), RemoteHandle::SlurmJobId("55".into()), "/scratch/job-2");
    let json = serde_json::to_string(&job).unwrap();
    let parsed: RemoteJob = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.remote_handle, job.remote_handle);
}
