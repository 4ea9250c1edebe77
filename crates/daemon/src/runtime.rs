// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon context: the durable store, the Queue Manager and
//! Workflow Orchestrator, the runner registry, and the broadcast channel
//! `events.subscribe` connections read from. One instance lives for the
//! life of the process, held behind an `Arc` by every task.

use std::collections::HashMap;
use std::sync::Arc;

use cm_core::{RemoteHandle, RunnerType, SchedulerMetrics};
use cm_engine::orchestrator::Orchestrator;
use cm_engine::queue::QueueManager;
use cm_runners::Runner;
use cm_storage::Store;
use cm_wire::RpcNotification;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Backlog depth for the notification broadcast channel; a slow or
/// unsubscribed connection simply misses old notifications rather than
/// blocking the publisher.
const NOTIFICATION_CAPACITY: usize = 1024;

pub struct Runtime {
    pub store: Arc<Store>,
    pub queue: Arc<QueueManager>,
    pub orchestrator: Arc<Orchestrator>,
    pub runners: HashMap<RunnerType, Arc<dyn Runner>>,
    pub shutdown: CancellationToken,
    /// Bounds concurrently in-flight RPC method handlers across every
    /// connection, the "bounded worker pool" spec.md's IPC section calls for.
    pub worker_permits: Arc<Semaphore>,
    notifications: broadcast::Sender<RpcNotification>,
    metrics: Mutex<SchedulerMetrics>,
    /// Remote handles for jobs the scheduler has dispatched but whose
    /// runner has not yet reported a terminal status. Consulted by the
    /// runner-watch task; removed once the job reaches a terminal state.
    in_flight: Mutex<HashMap<cm_core::JobId, (RunnerType, RemoteHandle)>>,
}

impl Runtime {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<QueueManager>,
        orchestrator: Arc<Orchestrator>,
        runners: HashMap<RunnerType, Arc<dyn Runner>>,
        worker_pool_size: usize,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            store,
            queue,
            orchestrator,
            runners,
            shutdown: CancellationToken::new(),
            worker_permits: Arc::new(Semaphore::new(worker_pool_size.max(1))),
            notifications,
            metrics: Mutex::new(SchedulerMetrics::default()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn runner(&self, runner_type: RunnerType) -> Option<Arc<dyn Runner>> {
        self.runners.get(&runner_type).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RpcNotification> {
        self.notifications.subscribe()
    }

    /// Best-effort publish: no subscribers is the common case, not an error.
    pub fn publish(&self, notification: RpcNotification) {
        let _ = self.notifications.send(notification);
    }

    pub fn track_in_flight(&self, job_id: cm_core::JobId, runner_type: RunnerType, handle: RemoteHandle) {
        self.in_flight.lock().insert(job_id, (runner_type, handle));
    }

    pub fn forget_in_flight(&self, job_id: cm_core::JobId) -> Option<(RunnerType, RemoteHandle)> {
        self.in_flight.lock().remove(&job_id)
    }

    pub fn in_flight_snapshot(&self) -> Vec<(cm_core::JobId, RunnerType, RemoteHandle)> {
        self.in_flight.lock().iter().map(|(id, (rt, h))| (*id, *rt, h.clone())).collect()
    }

    pub fn with_metrics<R>(&self, f: impl FnOnce(&mut SchedulerMetrics) -> R) -> R {
        f(&mut self.metrics.lock())
    }

    pub fn metrics_snapshot(&self) -> SchedulerMetrics {
        *self.metrics.lock()
    }

    /// Persist the current metrics snapshot, called once per scheduler tick.
    pub fn persist_metrics(&self) {
        let snapshot = self.metrics_snapshot();
        if let Err(err) = self.store.put_scheduler_metrics(&snapshot) {
            tracing::warn!(%err, "failed to persist scheduler metrics");
        }
    }

    pub fn initiate_shutdown(&self) {
        info!("shutdown requested");
        self.shutdown.cancel();
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
