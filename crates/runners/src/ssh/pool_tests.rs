// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cm_core::test_support::test_cluster;

struct NoSecrets;
impl Secrets for NoSecrets {
    fn get(&self, _cluster_id: ClusterId) -> Option<Credentials> {
        None
    }
}

#[tokio::test]
async fn acquire_without_credentials_surfaces_transport_error() {
    let pool = ConnectionPool::new(Arc::new(NoSecrets));
    let cluster = test_cluster(1);
    let err = pool.acquire(&cluster).await.unwrap_err();
    assert!(matches!(err, RunnerError::Transport(_)));
}

#[test]
fn pool_size_defaults_to_five() {
    assert_eq!(DEFAULT_POOL_SIZE, 5);
}
