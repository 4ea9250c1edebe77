// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cm_core::{ClusterConfig, ClusterKind, JobConfig};

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn setup(store: &Store) -> (JobId, ClusterId) {
    let cluster_id = store.create_cluster(ClusterConfig::builder("cluster-a", ClusterKind::Ssh, "login.example.edu").build()).unwrap();
    let job_id = store.create_job(JobConfig::builder("relax", "/scratch/rj-1").build(), 1_000).unwrap();
    (job_id, cluster_id)
}

#[test]
fn pid_handle_round_trips() {
    let store = store();
    let (job_id, cluster_id) = setup(&store);
    let remote_job = RemoteJob::new(job_id, cluster_id, RemoteHandle::Pid(4242), "/scratch/remote/relax-1");
    store.create_remote_job(&remote_job).unwrap();

    let loaded = store.get_remote_job(job_id).unwrap().unwrap();
    assert_eq!(loaded.remote_handle, RemoteHandle::Pid(4242));
    assert_eq!(loaded.remote_work_dir, "/scratch/remote/relax-1");
}

#[test]
fn slurm_job_id_handle_round_trips() {
    let store = store();
    let (job_id, cluster_id) = setup(&store);
    let remote_job = RemoteJob::new(job_id, cluster_id, RemoteHandle::SlurmJobId("987654".into()), "/scratch/remote/relax-2");
    store.create_remote_job(&remote_job).unwrap();

    let loaded = store.get_remote_job(job_id).unwrap().unwrap();
    assert_eq!(loaded.remote_handle, RemoteHandle::SlurmJobId("987654".into()));
}

#[test]
fn update_paths_only_overwrites_given_fields() {
    let store = store();
    let (job_id, cluster_id) = setup(&store);
    let remote_job = RemoteJob::new(job_id, cluster_id, RemoteHandle::Pid(1), "/scratch/remote/relax-3")
        .stdout_path("/scratch/remote/relax-3/stdout.log");
    store.create_remote_job(&remote_job).unwrap();

    store.update_remote_job_paths(job_id, None, Some("/scratch/remote/relax-3/stderr.log")).unwrap();

    let loaded = store.get_remote_job(job_id).unwrap().unwrap();
    assert_eq!(loaded.stdout_path.as_deref(), Some("/scratch/remote/relax-3/stdout.log"));
    assert_eq!(loaded.stderr_path.as_deref(), Some("/scratch/remote/relax-3/stderr.log"));
}
