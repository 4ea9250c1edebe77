// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Queue Manager: in-memory job readiness, scoring, and dispatch
//! bookkeeping over the durable [`cm_storage::Store`].
//!
//! `queuedJobs`/`dispatched`/`clusters`/`callbacks` live only in memory.
//! `queuedJobs` is rebuilt from `QueueState` rows at construction;
//! `dispatched` (jobs already handed to a runner, kept around only for
//! their retry counters) is rebuilt from `Jobs` rows in status `Running`,
//! with retry counters reset to zero — a job already dispatched before a
//! restart starts its retry budget over, since `QueueState` rows are
//! deleted at dequeue time and the `Jobs` table doesn't carry them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cm_core::{
    ClusterId, DependencyKind, JobId, JobStatus, Priority, QueuedJobState, ResourceMap, RunnerType,
};
use cm_storage::{Store, StoreError};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};

/// Default scheduling tick interval; also woken early on enqueue, dequeue,
/// completion, and resume.
pub const DEFAULT_SCHEDULING_INTERVAL: Duration = Duration::from_secs(1);

/// Registered once per job, before [`QueueManager::enqueue`]. Invoked with
/// the job's terminal status once [`QueueManager::handle_job_completion`]
/// has finished its own bookkeeping (slot release, retry-or-requeue).
pub type CompletionCallback = Box<dyn Fn(JobId, JobStatus) + Send + Sync>;

#[derive(Debug, Default)]
struct ClusterRuntime {
    paused: bool,
}

/// Read-only view of queue state, served by `system.metrics` / `jobs.list`.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub queued: Vec<QueuedJobState>,
    pub running: HashMap<ClusterId, Vec<JobId>>,
    pub paused_clusters: Vec<ClusterId>,
}

pub struct QueueManager {
    store: Arc<Store>,
    queued: Mutex<HashMap<JobId, QueuedJobState>>,
    dispatched: Mutex<HashMap<JobId, QueuedJobState>>,
    clusters: Mutex<HashMap<ClusterId, ClusterRuntime>>,
    callbacks: Mutex<HashMap<JobId, CompletionCallback>>,
    wake: Notify,
}

impl QueueManager {
    /// Reconstitute from the store: `queuedJobs` from `QueueState`, and
    /// `dispatched` from jobs currently in status `Running`.
    pub fn new(store: Arc<Store>) -> QueueResult<Self> {
        let mut queued = HashMap::new();
        for state in store.load_all_queue_state()? {
            queued.insert(state.job_id, state);
        }

        let mut dispatched = HashMap::new();
        for job in store.get_jobs_by_status(JobStatus::Running, u32::MAX)? {
            let mut state = QueuedJobState::new(job.id, job.runner_type, job.created_at_ms);
            if let Some(cluster_id) = job.cluster_id {
                state = state.cluster_id(cluster_id);
            }
            dispatched.insert(job.id, state);
        }

        Ok(Self {
            store,
            queued: Mutex::new(queued),
            dispatched: Mutex::new(dispatched),
            clusters: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(HashMap::new()),
            wake: Notify::new(),
        })
    }

    /// Must be called before [`Self::enqueue`] for the same job: the
    /// orchestrator relies on the callback being in place before the job can
    /// possibly complete.
    pub fn register_callback(&self, job_id: JobId, callback: CompletionCallback) -> QueueResult<()> {
        let mut callbacks = self.callbacks.lock();
        if callbacks.contains_key(&job_id) {
            return Err(QueueError::CallbackAlreadyRegistered(job_id));
        }
        callbacks.insert(job_id, callback);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &self,
        job_id: JobId,
        priority: Priority,
        deps: &[(JobId, DependencyKind)],
        runner_type: RunnerType,
        cluster_id: Option<ClusterId>,
        user_id: Option<String>,
        max_retries: u32,
        resources: ResourceMap,
    ) -> QueueResult<()> {
        if self.store.get_job(job_id)?.is_none() {
            return Err(QueueError::InvalidJob(job_id));
        }

        for (dep_id, kind) in deps {
            self.store.add_job_dependency(job_id, *dep_id, *kind).map_err(|err| match err {
                StoreError::DependencyCycle { .. } => QueueError::CircularDependency(job_id),
                other => QueueError::Store(other),
            })?;
        }

        let mut state = QueuedJobState::new(job_id, runner_type, now_ms())
            .priority(priority)
            .max_retries(max_retries)
            .resource_requirements(resources);
        if let Some(cluster_id) = cluster_id {
            state = state.cluster_id(cluster_id);
        }
        if let Some(user_id) = user_id {
            state = state.user_id(user_id);
        }

        self.store.save_queue_state(&state)?;
        self.queued.lock().insert(job_id, state);
        self.wake.notify_one();
        Ok(())
    }

    /// Evaluate readiness for every queued job of `runner_type`, score the
    /// ready set, and pop the winner into `Running`. Returns `None` if
    /// nothing is ready right now.
    pub fn dequeue(&self, runner_type: RunnerType) -> QueueResult<Option<JobId>> {
        let Some(state) = self.pick_next(runner_type)? else {
            return Ok(None);
        };
        let job_id = state.job_id;

        self.queued.lock().remove(&job_id);
        self.dispatched.lock().insert(job_id, state);
        self.store.remove_queue_state(job_id)?;
        self.store.update_job_status(job_id, JobStatus::Running, None, None)?;
        self.wake.notify_one();
        debug!(job_id = %job_id, "dequeued job for dispatch");
        Ok(Some(job_id))
    }

    /// Release the job's cluster slot and either requeue it (retry budget
    /// remaining, no callback fired: the job hasn't reached a final
    /// disposition yet) or invoke its callback and cancel its `AfterOk`
    /// dependents (retry budget exhausted).
    pub fn handle_job_completion(&self, job_id: JobId, terminal_status: JobStatus) -> QueueResult<()> {
        if !terminal_status.is_terminal() {
            warn!(job_id = %job_id, status = %terminal_status, "handle_job_completion called with non-terminal status");
        }

        let state = self.dispatched.lock().remove(&job_id);

        if terminal_status == JobStatus::Failed {
            if let Some(mut state) = state {
                if state.has_retry_budget() {
                    state.retry_count += 1;
                    self.store.update_job_status(job_id, JobStatus::Queued, None, None)?;
                    self.store.save_queue_state(&state)?;
                    self.queued.lock().insert(job_id, state);
                    self.wake.notify_one();
                    return Ok(());
                }
            }
            self.cancel_after_ok_dependents(job_id)?;
        }

        self.fire_callback(job_id, terminal_status)
    }

    pub fn pause_cluster(&self, cluster_id: ClusterId) {
        self.clusters.lock().entry(cluster_id).or_default().paused = true;
    }

    pub fn resume_cluster(&self, cluster_id: ClusterId) {
        self.clusters.lock().entry(cluster_id).or_default().paused = false;
        self.wake.notify_one();
    }

    /// Only effective while the job is still queued (not yet dispatched).
    pub fn reorder_queue(&self, job_id: JobId, new_priority: Priority) -> QueueResult<()> {
        let mut queued = self.queued.lock();
        let state = queued.remove(&job_id).ok_or(QueueError::NotQueued(job_id))?;
        let state = state.priority(new_priority);
        self.store.save_queue_state(&state)?;
        queued.insert(job_id, state);
        Ok(())
    }

    /// Drop a not-yet-dispatched job from both in-memory maps and its
    /// durable `QueueState` row, without touching its `Jobs` status. Used
    /// by callers that are about to (or already have) marked the job
    /// `Cancelled` directly, so it isn't mistakenly dequeued afterwards.
    /// A no-op if the job has already been dispatched or wasn't queued.
    pub fn forget_queued_job(&self, job_id: JobId) -> QueueResult<()> {
        if self.queued.lock().remove(&job_id).is_some() {
            self.store.remove_queue_state(job_id)?;
        }
        self.callbacks.lock().remove(&job_id);
        Ok(())
    }

    pub fn status(&self) -> QueueSnapshot {
        let queued = self.queued.lock().values().cloned().collect();
        let dispatched = self.dispatched.lock();
        let mut running: HashMap<ClusterId, Vec<JobId>> = HashMap::new();
        for state in dispatched.values() {
            if let Some(cluster_id) = state.cluster_id {
                running.entry(cluster_id).or_default().push(state.job_id);
            }
        }
        let paused_clusters =
            self.clusters.lock().iter().filter(|(_, rt)| rt.paused).map(|(id, _)| *id).collect();
        QueueSnapshot { queued, running, paused_clusters }
    }

    /// Wait until the next scheduling-relevant event (tick, enqueue,
    /// dequeue, completion, resume) or `interval` elapses, whichever comes
    /// first.
    pub async fn wait_for_tick(&self, interval: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = self.wake.notified() => {}
        }
    }

    fn fire_callback(&self, job_id: JobId, status: JobStatus) -> QueueResult<()> {
        let callback = self.callbacks.lock().remove(&job_id);
        if let Some(callback) = callback {
            callback(job_id, status);
        } else {
            info!(job_id = %job_id, "job reached a terminal status with no registered callback");
        }
        Ok(())
    }

    /// Cascades `Cancelled` through every transitive `AfterOk` dependent of
    /// a permanently-failed job. Worklist-driven rather than recursive so a
    /// diamond-shaped DAG (a job with two cancelled ancestors) only visits
    /// each dependent once instead of once per incoming path.
    fn cancel_after_ok_dependents(&self, job_id: JobId) -> QueueResult<()> {
        let mut visited: HashSet<JobId> = HashSet::new();
        let mut worklist = vec![job_id];
        while let Some(current) = worklist.pop() {
            for dependency in self.store.dependents_of(current)? {
                if dependency.kind != DependencyKind::AfterOk {
                    continue;
                }
                let dependent = dependency.job_id;
                if !visited.insert(dependent) {
                    continue;
                }
                self.queued.lock().remove(&dependent);
                self.store.remove_queue_state(dependent)?;
                self.store.update_job_status(dependent, JobStatus::Cancelled, None, Some(now_ms()))?;
                self.fire_callback(dependent, JobStatus::Cancelled)?;
                worklist.push(dependent);
            }
        }
        Ok(())
    }

    /// Steps 1-3 of the scheduling algorithm: fetch dependency statuses in
    /// one query, test readiness, and score. Returns the winning job's
    /// queue-state entry.
    fn pick_next(&self, runner_type: RunnerType) -> QueueResult<Option<QueuedJobState>> {
        let candidates: Vec<QueuedJobState> =
            self.queued.lock().values().filter(|s| s.runner_type == runner_type).cloned().collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let dep_job_ids: Vec<JobId> = candidates
            .iter()
            .flat_map(|s| self.store.dependencies_for_job(s.job_id).unwrap_or_default())
            .map(|d| d.depends_on_job_id)
            .collect();
        let dep_statuses = self.store.get_job_statuses_batch(&dep_job_ids)?;

        let clusters = self.clusters.lock();
        let dispatched = self.dispatched.lock();
        let mut best: Option<(i64, QueuedJobState)> = None;
        for state in candidates {
            if !self.dependencies_ready(state.job_id, &dep_statuses)? {
                continue;
            }
            if let Some(cluster_id) = state.cluster_id {
                let Some(cluster) = self.store.get_cluster(cluster_id)? else { continue };
                if cluster.status != cm_core::ClusterStatus::Active {
                    continue;
                }
                if clusters.get(&cluster_id).map(|rt| rt.paused).unwrap_or(false) {
                    continue;
                }
                let running = dispatched.values().filter(|s| s.cluster_id == Some(cluster_id)).count() as u32;
                if running >= cluster.max_concurrent {
                    continue;
                }
                if !resources_available(&cluster.available_resources, &state.resource_requirements) {
                    continue;
                }
            }

            let score = self.score(&state);
            if best.as_ref().map(|(best_score, _)| score > *best_score).unwrap_or(true) {
                best = Some((score, state));
            }
        }

        Ok(best.map(|(_, state)| state))
    }

    fn dependencies_ready(&self, job_id: JobId, dep_statuses: &HashMap<JobId, JobStatus>) -> QueueResult<bool> {
        for dep in self.store.dependencies_for_job(job_id)? {
            let Some(status) = dep_statuses.get(&dep.depends_on_job_id) else { return Ok(false) };
            let satisfied = match dep.kind {
                DependencyKind::AfterOk => *status == JobStatus::Completed,
                DependencyKind::AfterAny => status.is_terminal(),
                DependencyKind::AfterFailed => *status == JobStatus::Failed,
            };
            if !satisfied {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `score = (4 - priority) * 1000 + waitMinutes`. Fair-share weighting
    /// is not implemented; see DESIGN.md.
    fn score(&self, state: &QueuedJobState) -> i64 {
        let wait_minutes = (now_ms().saturating_sub(state.enqueued_at_ms)) / 60_000;
        (4 - state.priority.get() as i64) * 1000 + wait_minutes as i64
    }
}

fn resources_available(available: &ResourceMap, required: &ResourceMap) -> bool {
    required.iter().all(|(k, need)| available.get(k).copied().unwrap_or(0) >= *need)
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
