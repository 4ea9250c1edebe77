// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Workflow Orchestrator: validates and materializes a [`WorkflowSpec`]
//! DAG, resolves `{{upstream.*}}` placeholders against completed sibling
//! nodes, and drives submission via the [`QueueManager`].
//!
//! Node dispatch itself (handing a prepared input to a [`cm_runners::Runner`]
//! and retrieving its artifacts) happens outside this module, in whatever
//! polls [`QueueManager::dequeue`]; by the time [`Orchestrator::on_node_complete`]
//! runs, the job's `work_dir` is assumed to already hold the retrieved
//! output the configured [`OutputParser`] reads.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cm_core::{
    FailurePolicy, JobConfig, JobStatus, NodeId, Priority, ResourceMap, RunnerType, Workflow,
    WorkflowId, WorkflowNode, WorkflowSpec, WorkflowStatus,
};
use cm_storage::Store;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::generator::InputGenerator;
use crate::parser::OutputParser;
use crate::queue::QueueManager;
use crate::template::{self, Resolution, UpstreamResults};

/// Node-level retries (distinct from the queue's job-level retry counter)
/// before a `Retry`-policy workflow gives up on a node.
const MAX_NODE_RETRIES: u32 = 2;

/// A workflow plus its current node rows, served by `workflows.get`.
#[derive(Debug, Clone)]
pub struct WorkflowView {
    pub workflow: Workflow,
    pub nodes: Vec<WorkflowNode>,
}

pub struct Orchestrator {
    store: Arc<Store>,
    queue: Arc<QueueManager>,
    generator: Arc<dyn InputGenerator>,
    parser: Arc<dyn OutputParser>,
    scratch_base: Option<String>,
    node_retries: Mutex<HashMap<NodeId, u32>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<QueueManager>,
        generator: Arc<dyn InputGenerator>,
        parser: Arc<dyn OutputParser>,
    ) -> Self {
        Self { store, queue, generator, parser, scratch_base: None, node_retries: Mutex::new(HashMap::new()) }
    }

    pub fn with_scratch_base(mut self, scratch_base: impl Into<String>) -> Self {
        self.scratch_base = Some(scratch_base.into());
        self
    }

    /// Validate `spec` as an acyclic DAG of uniquely-keyed nodes, persist it,
    /// and enqueue its zero-dependency nodes.
    pub fn submit_workflow(self: &Arc<Self>, spec: WorkflowSpec) -> WorkflowResult<WorkflowId> {
        validate_dag(&spec)?;

        let failure_policy = spec.failure_policy.unwrap_or(FailurePolicy::FailFast);
        let workflow_id = self.store.create_workflow(&spec.name, failure_policy, now_ms())?;

        let mut key_to_node: HashMap<&str, NodeId> = HashMap::new();
        for node_spec in &spec.nodes {
            let node_id = self.store.create_workflow_node(
                workflow_id,
                &node_spec.name,
                &node_spec.template_ref,
                &node_spec.parameter_template,
                &[],
            )?;
            key_to_node.insert(&node_spec.key, node_id);
        }
        for node_spec in &spec.nodes {
            if node_spec.dependencies.is_empty() {
                continue;
            }
            let node_id = key_to_node[node_spec.key.as_str()];
            let deps: Vec<NodeId> = node_spec.dependencies.iter().map(|k| key_to_node[k.as_str()]).collect();
            self.store.set_node_dependencies(node_id, &deps)?;
        }

        self.store.update_workflow_status(workflow_id, WorkflowStatus::Running)?;
        self.submit_ready_nodes(workflow_id)?;
        Ok(workflow_id)
    }

    /// Cancel every non-terminal node's job and the workflow itself.
    pub fn cancel(&self, workflow_id: WorkflowId) -> WorkflowResult<()> {
        let workflow = self.store.get_workflow(workflow_id)?.ok_or(WorkflowError::NotFound(workflow_id))?;
        if workflow.status.is_terminal() {
            return Ok(());
        }
        for node in self.store.get_workflow_nodes(workflow_id)? {
            if node.status.is_terminal() {
                continue;
            }
            if let Some(job_id) = node.job_id {
                self.queue.forget_queued_job(job_id)?;
                self.store.update_job_status(job_id, JobStatus::Cancelled, None, Some(now_ms()))?;
            }
            self.store.update_node_status(node.node_id, JobStatus::Cancelled, None)?;
        }
        self.store.update_workflow_status(workflow_id, WorkflowStatus::Cancelled)?;
        Ok(())
    }

    pub fn get_workflow(&self, workflow_id: WorkflowId) -> WorkflowResult<WorkflowView> {
        let workflow = self.store.get_workflow(workflow_id)?.ok_or(WorkflowError::NotFound(workflow_id))?;
        let nodes = self.store.get_workflow_nodes(workflow_id)?;
        Ok(WorkflowView { workflow, nodes })
    }

    /// Called back by the Queue Manager once a node's job reaches a
    /// terminal status.
    fn on_node_complete(self: &Arc<Self>, workflow_id: WorkflowId, node_id: NodeId, status: JobStatus) {
        let result = match status {
            JobStatus::Completed => self.on_node_succeeded(workflow_id, node_id),
            JobStatus::Failed | JobStatus::Cancelled => self.on_node_failed(workflow_id, node_id, status),
            other => {
                warn!(?other, node_id = %node_id, "on_node_complete called with a non-terminal status");
                Ok(())
            }
        };
        if let Err(err) = result {
            error!(%err, workflow_id = %workflow_id, node_id = %node_id, "node completion handling failed");
        }
    }

    fn on_node_succeeded(self: &Arc<Self>, workflow_id: WorkflowId, node_id: NodeId) -> WorkflowResult<()> {
        let nodes = self.store.get_workflow_nodes(workflow_id)?;
        let node = nodes.iter().find(|n| n.node_id == node_id).ok_or(WorkflowError::NotFound(workflow_id))?;
        let job_id = node.job_id.ok_or_else(|| WorkflowError::InvalidWorkflow(format!("node {node_id} has no job")))?;
        let job = self.store.get_job(job_id)?.ok_or(WorkflowError::NotFound(workflow_id))?;

        let parsed = match self.parser.parse(&job.work_dir) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, node_id = %node_id, "output parsing failed, treating node as failed");
                return self.on_node_failed(workflow_id, node_id, JobStatus::Failed);
            }
        };
        let results_blob = serde_json::to_string(&parsed).map_err(|e| WorkflowError::InvalidWorkflow(e.to_string()))?;
        self.store.update_node_status(node_id, JobStatus::Completed, Some(&results_blob))?;

        self.maybe_finish_workflow(workflow_id)?;
        self.submit_ready_nodes(workflow_id)
    }

    fn on_node_failed(self: &Arc<Self>, workflow_id: WorkflowId, node_id: NodeId, status: JobStatus) -> WorkflowResult<()> {
        let workflow = self.store.get_workflow(workflow_id)?.ok_or(WorkflowError::NotFound(workflow_id))?;

        if workflow.failure_policy == FailurePolicy::Retry {
            let mut retries = self.node_retries.lock();
            let count = retries.entry(node_id).or_insert(0);
            if *count < MAX_NODE_RETRIES {
                *count += 1;
                drop(retries);
                info!(node_id = %node_id, attempt = count, "retrying failed workflow node");
                self.store.update_node_status(node_id, JobStatus::Pending, None)?;
                return self.submit_ready_nodes(workflow_id);
            }
        }

        self.store.update_node_status(node_id, status, None)?;

        match workflow.failure_policy {
            FailurePolicy::FailFast => {
                self.cancel_non_terminal_except(workflow_id, node_id)?;
                self.store.update_workflow_status(workflow_id, WorkflowStatus::Failed)?;
            }
            FailurePolicy::ContinueOnFailure | FailurePolicy::Retry => {
                self.cancel_descendants_of(workflow_id, node_id)?;
                self.maybe_finish_workflow(workflow_id)?;
                self.submit_ready_nodes(workflow_id)?;
            }
        }
        Ok(())
    }

    /// If every node has reached a terminal status, finalize the workflow:
    /// `Completed` unless any node ended `Failed`.
    fn maybe_finish_workflow(&self, workflow_id: WorkflowId) -> WorkflowResult<()> {
        let nodes = self.store.get_workflow_nodes(workflow_id)?;
        if !nodes.iter().all(|n| n.status.is_terminal()) {
            return Ok(());
        }
        let status = if nodes.iter().any(|n| n.status == JobStatus::Failed) {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Completed
        };
        self.store.update_workflow_status(workflow_id, status)?;
        Ok(())
    }

    fn cancel_non_terminal_except(&self, workflow_id: WorkflowId, except: NodeId) -> WorkflowResult<()> {
        for node in self.store.get_workflow_nodes(workflow_id)? {
            if node.node_id == except || node.status.is_terminal() {
                continue;
            }
            if let Some(job_id) = node.job_id {
                self.queue.forget_queued_job(job_id)?;
                self.store.update_job_status(job_id, JobStatus::Cancelled, None, Some(now_ms()))?;
            }
            self.store.update_node_status(node.node_id, JobStatus::Cancelled, None)?;
        }
        Ok(())
    }

    /// Cancel every not-yet-terminal node that transitively depends on
    /// `failed_node`: it can never resolve the upstream result it needs.
    fn cancel_descendants_of(&self, workflow_id: WorkflowId, failed_node: NodeId) -> WorkflowResult<()> {
        let nodes = self.store.get_workflow_nodes(workflow_id)?;
        let mut doomed: HashSet<NodeId> = HashSet::new();
        doomed.insert(failed_node);

        // Fixed-point sweep: small DAGs, simplicity over asymptotic cleverness.
        loop {
            let mut grew = false;
            for node in &nodes {
                if node.status.is_terminal() || doomed.contains(&node.node_id) {
                    continue;
                }
                if node.dependencies.iter().any(|d| doomed.contains(d)) {
                    doomed.insert(node.node_id);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        doomed.remove(&failed_node);

        for node in &nodes {
            if !doomed.contains(&node.node_id) {
                continue;
            }
            if let Some(job_id) = node.job_id {
                self.queue.forget_queued_job(job_id)?;
                self.store.update_job_status(job_id, JobStatus::Cancelled, None, Some(now_ms()))?;
            }
            self.store.update_node_status(node.node_id, JobStatus::Cancelled, None)?;
        }
        Ok(())
    }

    /// Submit every node whose dependencies are satisfied and whose
    /// parameter template fully resolves against completed upstream nodes.
    fn submit_ready_nodes(self: &Arc<Self>, workflow_id: WorkflowId) -> WorkflowResult<()> {
        let nodes = self.store.get_workflow_nodes(workflow_id)?;
        let by_id: HashMap<NodeId, &WorkflowNode> = nodes.iter().map(|n| (n.node_id, n)).collect();

        let completed_by_name: HashMap<&str, HashMap<String, String>> = nodes
            .iter()
            .filter(|n| n.status == JobStatus::Completed)
            .map(|n| (n.name.as_str(), parse_results_blob(n.results_blob.as_deref())))
            .collect();
        let upstream: UpstreamResults<'_> = completed_by_name.iter().map(|(k, v)| (*k, v)).collect();

        for node in &nodes {
            if node.status != JobStatus::Pending {
                continue;
            }
            let deps_done = node
                .dependencies
                .iter()
                .all(|dep_id| by_id.get(dep_id).map(|dep| dep.status == JobStatus::Completed).unwrap_or(false));
            if !deps_done {
                continue;
            }
            self.submit_node(workflow_id, node, &upstream)?;
        }
        Ok(())
    }

    fn submit_node(
        self: &Arc<Self>,
        workflow_id: WorkflowId,
        node: &WorkflowNode,
        upstream: &UpstreamResults<'_>,
    ) -> WorkflowResult<()> {
        let resolved_parameters = match template::resolve(&node.parameter_template, upstream) {
            Resolution::Resolved(s) => s,
            Resolution::Pending { node: upstream_node, key } => {
                info!(node_id = %node.node_id, upstream_node, key, "node not yet submittable");
                return Ok(());
            }
        };

        let prepared_input = self.generator.generate(&node.template_ref, &resolved_parameters)?;

        let work_dir = cm_core::paths::resolve_scratch_base(self.scratch_base.as_deref())
            .join(format!("cm-workflow-{workflow_id}-node-{}", node.node_id));

        let job_config = JobConfig::builder(&node.name, work_dir)
            .input_blob(prepared_input)
            .parent_workflow(workflow_id)
            .parent_node(node.node_id)
            .build();
        let job_id = self.store.create_job(job_config, now_ms())?;
        self.store.set_node_job(node.node_id, job_id)?;

        let this = Arc::clone(self);
        let node_id = node.node_id;
        self.queue.register_callback(
            job_id,
            Box::new(move |_job_id, status| this.on_node_complete(workflow_id, node_id, status)),
        )?;

        // Node-level retries (FailurePolicy::Retry) are the orchestrator's concern;
        // giving the queue its own retry budget too would mean two independent,
        // overlapping retry loops for the same node.
        self.queue.enqueue(
            job_id,
            Priority::default(),
            &[],
            RunnerType::Local,
            None,
            None,
            0,
            ResourceMap::new(),
        )?;
        Ok(())
    }
}

fn parse_results_blob(blob: Option<&str>) -> HashMap<String, String> {
    blob.and_then(|b| serde_json::from_str(b).ok()).unwrap_or_default()
}

/// Check `spec` for a valid DAG: unique node keys, dependencies that
/// reference only keys within the same spec, and no cycle.
fn validate_dag(spec: &WorkflowSpec) -> WorkflowResult<()> {
    let mut keys = HashSet::new();
    for node in &spec.nodes {
        if !keys.insert(node.key.as_str()) {
            return Err(WorkflowError::InvalidWorkflow(format!("duplicate node key {:?}", node.key)));
        }
    }
    for node in &spec.nodes {
        for dep in &node.dependencies {
            if !keys.contains(dep.as_str()) {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "node {:?} depends on unknown key {:?}",
                    node.key, dep
                )));
            }
        }
    }

    let by_key: HashMap<&str, &cm_core::WorkflowNodeSpec> = spec.nodes.iter().map(|n| (n.key.as_str(), n)).collect();
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    for node in &spec.nodes {
        if !visited.contains(node.key.as_str()) {
            visit(node.key.as_str(), &by_key, &mut visiting, &mut visited)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    key: &'a str,
    by_key: &HashMap<&'a str, &'a cm_core::WorkflowNodeSpec>,
    visiting: &mut HashSet<&'a str>,
    visited: &mut HashSet<&'a str>,
) -> WorkflowResult<()> {
    if visited.contains(key) {
        return Ok(());
    }
    if !visiting.insert(key) {
        return Err(WorkflowError::InvalidWorkflow(format!("dependency cycle through node {key:?}")));
    }
    let node = by_key[key];
    for dep in &node.dependencies {
        visit(dep, by_key, visiting, visited)?;
    }
    visiting.remove(key);
    visited.insert(key);
    Ok(())
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
