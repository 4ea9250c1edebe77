// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-cluster pool of long-lived SSH sessions.
//!
//! Amortizes handshake cost and guarantees the process does not leak idle
//! connections: a background health-check task evicts unhealthy or
//! over-aged connections, and connections idle past a threshold are
//! closed outright.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cm_core::{Cluster, ClusterId};
use parking_lot::Mutex;
use russh::client;
use tokio::sync::Semaphore;

use crate::error::{RunnerError, RunnerResult};
use crate::secrets::{Credentials, Secrets};

/// Connection pool bound, per cluster, unless the cluster overrides it.
pub const DEFAULT_POOL_SIZE: usize = 5;
const ACQUIRE_BACKOFF: Duration = Duration::from_millis(500);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const MAX_CONSECUTIVE_FAILURES: u32 = 3;
const MAX_CONNECTION_AGE: Duration = Duration::from_secs(3600);
const MAX_IDLE_TIME: Duration = Duration::from_secs(300);

struct Handler {
    known_hosts_path: PathBuf,
}

#[async_trait::async_trait]
impl client::Handler for Handler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &russh_keys::key::PublicKey) -> Result<bool, Self::Error> {
        // Host-key verification is always enabled: the key must appear in
        // the known-hosts file. There is no "accept any" fallback.
        let known = russh_keys::check_known_hosts_path(
            "",
            22,
            server_public_key,
            &self.known_hosts_path,
        )
        .unwrap_or(false);
        Ok(known)
    }
}

pub struct PooledConnection {
    pub session: client::Handle<Handler>,
    created_at: Instant,
    last_used: Instant,
    consecutive_failures: u32,
}

impl PooledConnection {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > MAX_CONNECTION_AGE
    }

    fn is_idle_too_long(&self) -> bool {
        self.last_used.elapsed() > MAX_IDLE_TIME
    }

    fn is_unhealthy(&self) -> bool {
        self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES
    }
}

struct ClusterPool {
    connections: Mutex<Vec<PooledConnection>>,
    semaphore: Arc<Semaphore>,
}

/// Bounded, per-cluster pool of SSH connections.
pub struct ConnectionPool {
    pools: Mutex<HashMap<ClusterId, Arc<ClusterPool>>>,
    secrets: Arc<dyn Secrets>,
    known_hosts_path: PathBuf,
    pool_size: usize,
}

impl ConnectionPool {
    pub fn new(secrets: Arc<dyn Secrets>) -> Self {
        Self::with_pool_size(secrets, DEFAULT_POOL_SIZE)
    }

    pub fn with_pool_size(secrets: Arc<dyn Secrets>, pool_size: usize) -> Self {
        let known_hosts_path =
            dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join(".ssh").join("known_hosts");
        Self { pools: Mutex::new(HashMap::new()), secrets, known_hosts_path, pool_size }
    }

    fn pool_for(&self, cluster: &Cluster) -> Arc<ClusterPool> {
        let mut pools = self.pools.lock();
        pools
            .entry(cluster.id)
            .or_insert_with(|| {
                Arc::new(ClusterPool {
                    connections: Mutex::new(Vec::new()),
                    semaphore: Arc::new(Semaphore::new(self.pool_size)),
                })
            })
            .clone()
    }

    /// Acquire a healthy connection for `cluster`, creating one if the
    /// pool has spare capacity, or waiting with backoff if it's saturated.
    pub async fn acquire(&self, cluster: &Cluster) -> RunnerResult<PooledConnection> {
        let pool = self.pool_for(cluster);
        loop {
            if let Some(conn) = self.try_take_healthy(&pool) {
                return Ok(conn);
            }
            let permit = pool.semaphore.clone().try_acquire_owned();
            match permit {
                Ok(permit) => {
                    let conn = self.connect(cluster).await?;
                    std::mem::forget(permit);
                    return Ok(conn);
                }
                Err(_) => tokio::time::sleep(ACQUIRE_BACKOFF).await,
            }
        }
    }

    /// Return a connection to the pool for reuse, unless it's aged out.
    pub fn release(&self, cluster: &Cluster, mut conn: PooledConnection) {
        conn.last_used = Instant::now();
        if conn.is_expired() || conn.is_unhealthy() {
            return;
        }
        let pool = self.pool_for(cluster);
        pool.connections.lock().push(conn);
    }

    fn try_take_healthy(&self, pool: &ClusterPool) -> Option<PooledConnection> {
        let mut connections = pool.connections.lock();
        while let Some(conn) = connections.pop() {
            if conn.is_expired() || conn.is_unhealthy() || conn.is_idle_too_long() {
                continue;
            }
            return Some(conn);
        }
        None
    }

    async fn connect(&self, cluster: &Cluster) -> RunnerResult<PooledConnection> {
        let credentials = self
            .secrets
            .get(cluster.id)
            .ok_or_else(|| RunnerError::Transport(format!("no credentials for cluster {}", cluster.id)))?;

        let config = Arc::new(client::Config::default());
        let handler = Handler { known_hosts_path: self.known_hosts_path.clone() };
        let mut session = client::connect(config, (cluster.host.as_str(), cluster.port), handler)
            .await
            .map_err(|e| RunnerError::Transport(format!("connect to {}: {e}", cluster.host)))?;

        let authenticated = match credentials {
            Credentials::PrivateKeyFile { path, passphrase } => {
                let key_pair = russh_keys::load_secret_key(&path, passphrase.as_deref())
                    .map_err(|e| RunnerError::Transport(format!("load key {}: {e}", path.display())))?;
                session
                    .authenticate_publickey(&cluster.user, Arc::new(key_pair))
                    .await
                    .map_err(|e| RunnerError::Transport(format!("publickey auth: {e}")))?
            }
            Credentials::Password(password) => session
                .authenticate_password(&cluster.user, password)
                .await
                .map_err(|e| RunnerError::Transport(format!("password auth: {e}")))?,
        };
        if !authenticated {
            return Err(RunnerError::Transport(format!("authentication rejected for cluster {}", cluster.id)));
        }

        let now = Instant::now();
        Ok(PooledConnection { session, created_at: now, last_used: now, consecutive_failures: 0 })
    }

    /// Run `cmd` on the remote host over an acquired connection and
    /// release it afterward. Records a health-check failure on error so
    /// the connection is evicted after enough consecutive misses.
    pub async fn exec(&self, cluster: &Cluster, cmd: &str) -> RunnerResult<(u32, String)> {
        let mut conn = self.acquire(cluster).await?;
        let result = run_exec(&mut conn.session, cmd).await;
        match &result {
            Ok(_) => conn.consecutive_failures = 0,
            Err(_) => conn.consecutive_failures += 1,
        }
        self.release(cluster, conn);
        result
    }
}

impl ConnectionPool {
    /// Write `contents` to `remote_path` via `cat > path`, streamed over
    /// the exec channel so binary-unsafe bytes never need shell-escaping.
    pub async fn write_file(&self, cluster: &Cluster, remote_path: &str, contents: &[u8]) -> RunnerResult<()> {
        let mut conn = self.acquire(cluster).await?;
        let cmd = format!("cat > {}", crate::ssh::quoting::quote(remote_path));
        let result = async {
            let mut channel = conn
                .session
                .channel_open_session()
                .await
                .map_err(|e| RunnerError::Transport(format!("open channel: {e}")))?;
            channel.exec(true, cmd).await.map_err(|e| RunnerError::Transport(format!("exec: {e}")))?;
            channel.data(contents).await.map_err(|e| RunnerError::Transport(format!("write: {e}")))?;
            channel.eof().await.map_err(|e| RunnerError::Transport(format!("eof: {e}")))?;
            while let Some(msg) = channel.wait().await {
                if matches!(msg, russh::ChannelMsg::Close | russh::ChannelMsg::Eof) {
                    break;
                }
            }
            Ok(())
        }
        .await;
        match &result {
            Ok(_) => conn.consecutive_failures = 0,
            Err(_) => conn.consecutive_failures += 1,
        }
        self.release(cluster, conn);
        result
    }

    /// Read the full contents of `remote_path` via `cat path`.
    pub async fn read_file(&self, cluster: &Cluster, remote_path: &str) -> RunnerResult<Vec<u8>> {
        let (_, output) = self.exec(cluster, &format!("cat {}", crate::ssh::quoting::quote(remote_path))).await?;
        Ok(output.into_bytes())
    }
}

async fn run_exec(session: &mut client::Handle<Handler>, cmd: &str) -> RunnerResult<(u32, String)> {
    let mut channel =
        session.channel_open_session().await.map_err(|e| RunnerError::Transport(format!("open channel: {e}")))?;
    channel.exec(true, cmd).await.map_err(|e| RunnerError::Transport(format!("exec: {e}")))?;

    let mut output = Vec::new();
    let mut exit_status = 0u32;
    while let Some(msg) = channel.wait().await {
        match msg {
            russh::ChannelMsg::Data { ref data } => output.extend_from_slice(data),
            russh::ChannelMsg::ExitStatus { exit_status: status } => exit_status = status,
            russh::ChannelMsg::Eof | russh::ChannelMsg::Close => break,
            _ => {}
        }
    }
    Ok((exit_status, String::from_utf8_lossy(&output).into_owned()))
}

/// Background task: every [`HEALTH_CHECK_INTERVAL`], run a cheap remote
/// `true` on idle connections and evict ones that fail repeatedly.
pub async fn run_health_checks(pool: Arc<ConnectionPool>, cluster: Cluster) {
    let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = pool.exec(&cluster, "true").await {
            tracing::warn!(cluster = %cluster.name, error = %e, "ssh health check failed");
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
