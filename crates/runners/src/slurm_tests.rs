// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::secrets::{Credentials, Secrets};
use cm_core::test_support::{pending_job, test_cluster};

struct NoSecrets;
impl Secrets for NoSecrets {
    fn get(&self, _cluster_id: cm_core::ClusterId) -> Option<Credentials> {
        None
    }
}

struct SingleCluster(Cluster);
impl ClusterLookup for SingleCluster {
    fn get(&self, cluster_id: cm_core::ClusterId) -> Option<Cluster> {
        (self.0.id == cluster_id).then(|| self.0.clone())
    }
}

fn runner() -> SlurmRunner {
    let cluster = test_cluster(1);
    let pool = Arc::new(ConnectionPool::new(Arc::new(NoSecrets)));
    SlurmRunner::new(pool, Arc::new(SingleCluster(cluster)))
}

#[test]
fn partition_allow_list_accepts_ordinary_names() {
    assert!(validate("partition", "gpu-a100").is_ok());
}

#[test]
fn partition_allow_list_rejects_shell_metacharacters() {
    assert!(validate("partition", "gpu; rm -rf /").is_err());
}

#[test]
fn render_script_includes_partition_and_parallelism_directives() {
    let mut job = pending_job(1);
    job.parallelism = Some(cm_core::ParallelismConfig {
        mode: cm_core::ParallelismMode::Mpi,
        ranks: 16,
        threads: 1,
        nodes: 2,
    });
    let defaults = SlurmDefaults { partition: Some("gpu-a100".into()), ..SlurmDefaults::default() };
    let script = SlurmRunner::render_script(&job, &defaults, "/scratch/j1", "/scratch/j1/input").unwrap();
    assert!(script.contains("--partition=gpu-a100"));
    assert!(script.contains("--ntasks=16"));
    assert!(script.contains("--nodes=2"));
}

#[test]
fn render_script_rejects_hostile_partition_name() {
    let job = pending_job(1);
    let defaults = SlurmDefaults { partition: Some("gpu; rm -rf /".into()), ..SlurmDefaults::default() };
    assert!(SlurmRunner::render_script(&job, &defaults, "/scratch/j1", "/scratch/j1/input").is_err());
}

#[test]
fn sbatch_output_parses_trailing_job_id() {
    assert_eq!(parse_sbatch_job_id("Submitted batch job 123456"), Some("123456".to_string()));
}

#[test]
fn sbatch_output_rejects_unparseable_text() {
    assert_eq!(parse_sbatch_job_id("sbatch: error: invalid partition"), None);
}

#[tokio::test]
async fn submit_without_cluster_id_is_rejected() {
    let runner = runner();
    let job = pending_job(1);
    let err = runner.submit(&job, "input").await.unwrap_err();
    assert!(matches!(err, RunnerError::InvalidInput(_)));
}

#[tokio::test]
async fn poll_on_unknown_handle_errors() {
    let runner = runner();
    let err = runner.poll(&RemoteHandle::SlurmJobId("9999".into())).await.unwrap_err();
    assert!(matches!(err, RunnerError::UnknownHandle(_)));
}
