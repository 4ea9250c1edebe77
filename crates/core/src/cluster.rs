// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster entity: a remote execution target reachable over SSH or SLURM.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_int_id! {
    /// Unique identifier for a cluster. Monotonic, assigned by the Store.
    pub struct ClusterId;
}

/// Default concurrency cap for a newly created cluster.
pub const DEFAULT_MAX_CONCURRENT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    Ssh,
    Slurm,
}

crate::simple_display! {
    ClusterKind {
        Ssh => "ssh",
        Slurm => "slurm",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Active,
    Inactive,
    Error,
}

crate::simple_display! {
    ClusterStatus {
        Active => "active",
        Inactive => "inactive",
        Error => "error",
    }
}

/// Resource quantities available on a cluster (resource name -> count),
/// also used by [`crate::queue_state::QueuedJobState::resource_requirements`]
/// for elementwise admission checks.
pub type ResourceMap = HashMap<String, i64>;

/// Structured, queue-opaque connection details (scratch base, SSH key path,
/// SLURM partition defaults, ...). The Queue Manager never inspects this;
/// only the runner for `kind` interprets it.
pub type ConnectionConfig = serde_json::Value;

/// A remote execution target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    pub kind: ClusterKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub connection_config: ConnectionConfig,
    pub status: ClusterStatus,
    pub max_concurrent: u32,
    pub available_resources: ResourceMap,
}

/// Configuration for creating a new cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub name: String,
    pub kind: ClusterKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub connection_config: ConnectionConfig,
    pub max_concurrent: u32,
    pub available_resources: ResourceMap,
}

impl ClusterConfig {
    pub fn builder(name: impl Into<String>, kind: ClusterKind, host: impl Into<String>) -> ClusterConfigBuilder {
        ClusterConfigBuilder {
            name: name.into(),
            kind,
            host: host.into(),
            port: 22,
            user: String::new(),
            connection_config: serde_json::Value::Null,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            available_resources: ResourceMap::new(),
        }
    }
}

pub struct ClusterConfigBuilder {
    name: String,
    kind: ClusterKind,
    host: String,
    port: u16,
    user: String,
    connection_config: ConnectionConfig,
    max_concurrent: u32,
    available_resources: ResourceMap,
}

impl ClusterConfigBuilder {
    crate::setters! {
        into {
            user: String,
        }
        set {
            port: u16,
            connection_config: ConnectionConfig,
            max_concurrent: u32,
            available_resources: ResourceMap,
        }
    }

    pub fn build(self) -> ClusterConfig {
        ClusterConfig {
            name: self.name,
            kind: self.kind,
            host: self.host,
            port: self.port,
            user: self.user,
            connection_config: self.connection_config,
            max_concurrent: self.max_concurrent,
            available_resources: self.available_resources,
        }
    }
}

crate::builder! {
    pub struct ClusterBuilder => Cluster {
        into {
            name: String = "cluster-1",
            host: String = "login.example.edu",
            user: String = "chem",
        }
        set {
            id: ClusterId = ClusterId::new(1),
            kind: ClusterKind = ClusterKind::Ssh,
            port: u16 = 22,
            connection_config: ConnectionConfig = serde_json::Value::Null,
            status: ClusterStatus = ClusterStatus::Active,
            max_concurrent: u32 = DEFAULT_MAX_CONCURRENT,
            available_resources: ResourceMap = ResourceMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
