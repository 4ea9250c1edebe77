// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crystalmathd`: the workstation-resident orchestrator daemon.
//!
//! Bootstrap order matters: the store opens first, then startup
//! reconciliation runs against it before the Queue Manager reconstitutes
//! its in-memory state, then the runner backends, Queue Manager, and
//! Workflow Orchestrator are built, then the socket binds, and finally the
//! listener/scheduler/watcher tasks are spawned against a shared
//! [`Runtime`]. `SIGINT`/`SIGTERM` trip the same [`tokio_util::sync::CancellationToken`]
//! every task already watches; shutdown waits up to
//! [`config::drain_timeout`] for them to finish before exiting.

use std::collections::HashMap;
use std::sync::Arc;

use cm_core::{JobStatus, RunnerType};
use cm_engine::cluster_lookup::StoreClusterLookup;
use cm_engine::orchestrator::Orchestrator;
use cm_engine::queue::QueueManager;
use cm_runners::{ConnectionPool, LocalRunner, Runner, SlurmRunner, SshRunner};
use cm_storage::Store;
use tracing::{error, info, warn};

use cm_daemon::config;
use cm_daemon::runtime::Runtime;
use cm_daemon::scheduler;
use cm_daemon::secrets::StoreSecrets;
use cm_daemon::socket;
use cm_daemon::templates::{FileInputGenerator, KeyValueOutputParser};
use cm_daemon::watcher;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    info!(version = env!("CARGO_PKG_VERSION"), "starting crystalmathd");

    let store = match Store::open(config::store_path()) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(%err, "failed to open store");
            std::process::exit(1);
        }
    };

    reconcile_running_jobs(&store);

    let secrets = Arc::new(StoreSecrets::new(Arc::clone(&store)));
    let pool = Arc::new(ConnectionPool::new(secrets));
    let cluster_lookup = Arc::new(StoreClusterLookup::new(Arc::clone(&store)));

    let mut runners: HashMap<RunnerType, Arc<dyn Runner>> = HashMap::new();
    runners.insert(RunnerType::Local, Arc::new(LocalRunner::new()));
    runners.insert(RunnerType::Ssh, Arc::new(SshRunner::new(Arc::clone(&pool), Arc::clone(&cluster_lookup) as _)));
    runners.insert(RunnerType::Slurm, Arc::new(SlurmRunner::new(pool, cluster_lookup as _)));

    let queue = match QueueManager::new(Arc::clone(&store)) {
        Ok(queue) => Arc::new(queue),
        Err(err) => {
            error!(%err, "failed to reconstitute queue state");
            std::process::exit(1);
        }
    };
    let generator = Arc::new(FileInputGenerator::new(config::template_dir()));
    let parser = Arc::new(KeyValueOutputParser::new("output"));
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), Arc::clone(&queue), generator, parser));

    let runtime = Arc::new(Runtime::new(store, queue, orchestrator, runners, config::worker_pool_size()));

    let socket_path = socket::resolve_path();
    let listener = match socket::bind(&socket_path).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, path = %socket_path.display(), "failed to bind socket");
            std::process::exit(1);
        }
    };
    info!(path = %socket_path.display(), "listening");

    let accept_task = tokio::spawn(cm_daemon::accept_loop::run(listener, Arc::clone(&runtime)));
    let scheduler_task = tokio::spawn(scheduler::run(Arc::clone(&runtime)));
    let watcher_task = tokio::spawn(watcher::run(Arc::clone(&runtime)));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining");
    runtime.initiate_shutdown();

    let drain = futures_join(accept_task, scheduler_task, watcher_task);
    if tokio::time::timeout(config::drain_timeout(), drain).await.is_err() {
        warn!("drain timeout elapsed, exiting anyway");
    }
    let _ = std::fs::remove_file(&socket_path);
}

async fn futures_join(
    accept_task: tokio::task::JoinHandle<()>,
    scheduler_task: tokio::task::JoinHandle<()>,
    watcher_task: tokio::task::JoinHandle<()>,
) {
    let _ = tokio::join!(accept_task, scheduler_task, watcher_task);
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(err) => {
                error!(%err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Any job left `Running` is a prior process that died mid-execution;
/// there is no live handle to reattach to, so it is reported failed.
fn reconcile_running_jobs(store: &Store) {
    let running = match store.get_jobs_by_status(JobStatus::Running, u32::MAX) {
        Ok(jobs) => jobs,
        Err(err) => {
            error!(%err, "failed to list running jobs at startup");
            return;
        }
    };
    for job in running {
        warn!(job_id = %job.id, "marking job failed: server restart");
        if let Err(err) = store.update_job_status(job.id, JobStatus::Failed, None, None) {
            error!(%err, job_id = %job.id, "failed to reconcile running job at startup");
        }
    }
}
