// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cm_core::{ClusterConfig, ClusterKind};
use serde_json::json;
use serial_test::serial;

fn store_with_cluster(connection_config: serde_json::Value) -> (Arc<Store>, ClusterId) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let config = ClusterConfig::builder("login1", ClusterKind::Ssh, "login1.example.edu")
        .connection_config(connection_config)
        .build();
    let id = store.create_cluster(config).unwrap();
    (store, id)
}

#[test]
fn resolves_a_private_key_file_from_connection_config() {
    let (store, cluster_id) =
        store_with_cluster(json!({"private_key_path": "/home/u/.ssh/id_ed25519"}));
    let secrets = StoreSecrets::new(store);

    match secrets.get(cluster_id) {
        Some(Credentials::PrivateKeyFile { path, passphrase }) => {
            assert_eq!(path, PathBuf::from("/home/u/.ssh/id_ed25519"));
            assert!(passphrase.is_none());
        }
        other => panic!("expected a private key credential, got {other:?}"),
    }
}

#[test]
#[serial]
fn resolves_a_password_from_the_named_env_var() {
    std::env::set_var("CRY_TEST_CLUSTER_PASSWORD", "hunter2");
    let (store, cluster_id) = store_with_cluster(json!({"password_env": "CRY_TEST_CLUSTER_PASSWORD"}));
    let secrets = StoreSecrets::new(store);

    match secrets.get(cluster_id) {
        Some(Credentials::Password(pw)) => assert_eq!(pw, "hunter2"),
        other => panic!("expected a password credential, got {other:?}"),
    }
    std::env::remove_var("CRY_TEST_CLUSTER_PASSWORD");
}

#[test]
fn returns_none_when_connection_config_names_no_credential() {
    let (store, cluster_id) = store_with_cluster(json!({"remote_scratch_base": "/scratch"}));
    let secrets = StoreSecrets::new(store);
    assert!(secrets.get(cluster_id).is_none());
}

#[test]
fn returns_none_for_an_unknown_cluster() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let secrets = StoreSecrets::new(store);
    assert!(secrets.get(ClusterId::new(999)).is_none());
}
