// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Secrets`] backed by each cluster's own `connection_config` row: a
//! private key file path (with optional passphrase), or the name of an
//! environment variable holding a keyring-sourced password. Actual secret
//! storage (a real keyring, vault, etc.) is out of scope here — this just
//! resolves the pointer the cluster record already carries.

use std::path::PathBuf;
use std::sync::Arc;

use cm_core::ClusterId;
use cm_runners::{Credentials, Secrets};
use cm_storage::Store;

pub struct StoreSecrets {
    store: Arc<Store>,
}

impl StoreSecrets {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl Secrets for StoreSecrets {
    fn get(&self, cluster_id: ClusterId) -> Option<Credentials> {
        let cluster = self.store.get_cluster(cluster_id).ok().flatten()?;
        let cfg = &cluster.connection_config;

        if let Some(path) = cfg.get("private_key_path").and_then(|v| v.as_str()) {
            let passphrase = cfg.get("private_key_passphrase").and_then(|v| v.as_str()).map(String::from);
            return Some(Credentials::PrivateKeyFile { path: PathBuf::from(path), passphrase });
        }

        if let Some(env_var) = cfg.get("password_env").and_then(|v| v.as_str()) {
            return std::env::var(env_var).ok().map(Credentials::Password);
        }

        None
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
