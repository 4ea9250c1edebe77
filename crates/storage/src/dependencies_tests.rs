// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cm_core::JobConfig;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn job(store: &Store, work_dir: &str) -> JobId {
    store.create_job(JobConfig::builder("j", work_dir).build(), 1_000).unwrap()
}

#[test]
fn direct_cycle_is_rejected() {
    let store = store();
    let a = job(&store, "/scratch/a");
    let b = job(&store, "/scratch/b");

    store.add_job_dependency(a, b, DependencyKind::AfterOk).unwrap();
    let result = store.add_job_dependency(b, a, DependencyKind::AfterOk);
    assert!(matches!(result, Err(StoreError::DependencyCycle { .. })));
}

#[test]
fn self_dependency_is_rejected() {
    let store = store();
    let a = job(&store, "/scratch/self");
    let result = store.add_job_dependency(a, a, DependencyKind::AfterOk);
    assert!(matches!(result, Err(StoreError::DependencyCycle { .. })));
}

#[test]
fn transitive_cycle_through_three_jobs_is_rejected() {
    let store = store();
    let a = job(&store, "/scratch/t-a");
    let b = job(&store, "/scratch/t-b");
    let c = job(&store, "/scratch/t-c");

    store.add_job_dependency(a, b, DependencyKind::AfterOk).unwrap();
    store.add_job_dependency(b, c, DependencyKind::AfterOk).unwrap();
    let result = store.add_job_dependency(c, a, DependencyKind::AfterOk);
    assert!(matches!(result, Err(StoreError::DependencyCycle { .. })));
}

#[test]
fn diamond_shaped_graph_is_accepted() {
    let store = store();
    let a = job(&store, "/scratch/d-a");
    let b = job(&store, "/scratch/d-b");
    let c = job(&store, "/scratch/d-c");
    let d = job(&store, "/scratch/d-d");

    store.add_job_dependency(b, a, DependencyKind::AfterOk).unwrap();
    store.add_job_dependency(c, a, DependencyKind::AfterOk).unwrap();
    store.add_job_dependency(d, b, DependencyKind::AfterOk).unwrap();
    store.add_job_dependency(d, c, DependencyKind::AfterOk).unwrap();

    let deps = store.dependencies_for_job(d).unwrap();
    assert_eq!(deps.len(), 2);
}

#[test]
fn dependents_of_returns_reverse_edges() {
    let store = store();
    let a = job(&store, "/scratch/rev-a");
    let b = job(&store, "/scratch/rev-b");
    let c = job(&store, "/scratch/rev-c");

    store.add_job_dependency(b, a, DependencyKind::AfterOk).unwrap();
    store.add_job_dependency(c, a, DependencyKind::AfterOk).unwrap();

    let dependents = store.dependents_of(a).unwrap();
    assert_eq!(dependents.len(), 2);
    assert!(dependents.iter().all(|d| d.depends_on_job_id == a));
}
