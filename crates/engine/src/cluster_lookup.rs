// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ClusterLookup`] backed directly by the store, so the SSH/SLURM runners
//! don't need their own copy of cluster configuration.

use std::sync::Arc;

use cm_core::{Cluster, ClusterId};
use cm_runners::ClusterLookup;
use cm_storage::Store;

pub struct StoreClusterLookup {
    store: Arc<Store>,
}

impl StoreClusterLookup {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl ClusterLookup for StoreClusterLookup {
    fn get(&self, cluster_id: ClusterId) -> Option<Cluster> {
        self.store.get_cluster(cluster_id).ok().flatten()
    }
}
