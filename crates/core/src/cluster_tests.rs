// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_max_concurrent_is_four() {
    let config = ClusterConfig::builder("c1", ClusterKind::Ssh, "host.example.edu").build();
    assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
    assert_eq!(config.max_concurrent, 4);
}

#[test]
fn builder_overrides_port_and_resources() {
    let mut resources = ResourceMap::new();
    resources.insert("gpu".to_string(), 2);

    let config = ClusterConfig::builder("c2", ClusterKind::Slurm, "hpc.example.edu")
        .user("chem")
        .port(2222)
        .max_concurrent(8)
        .available_resources(resources.clone())
        .build();

    assert_eq!(config.port, 2222);
    assert_eq!(config.max_concurrent, 8);
    assert_eq!(config.available_resources, resources);
}

#[test]
fn cluster_kind_and_status_display() {
    assert_eq!(ClusterKind::Slurm.to_string(), "slurm");
    assert_eq!(ClusterStatus::Inactive.to_string(), "inactive");
}
