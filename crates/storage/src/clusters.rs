// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster rows: `CreateCluster`, `UpdateCluster`, `DeleteCluster`, and reads.

use rusqlite::{params, OptionalExtension, Row};

use cm_core::{Cluster, ClusterConfig, ClusterId, ClusterKind, ClusterStatus, ResourceMap};

use crate::error::{StoreError, StoreResult};
use crate::Store;

fn kind_to_str(kind: ClusterKind) -> &'static str {
    match kind {
        ClusterKind::Ssh => "ssh",
        ClusterKind::Slurm => "slurm",
    }
}

fn kind_from_str(s: &str) -> rusqlite::Result<ClusterKind> {
    match s {
        "ssh" => Ok(ClusterKind::Ssh),
        "slurm" => Ok(ClusterKind::Slurm),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn status_to_str(status: ClusterStatus) -> &'static str {
    match status {
        ClusterStatus::Active => "active",
        ClusterStatus::Inactive => "inactive",
        ClusterStatus::Error => "error",
    }
}

fn status_from_str(s: &str) -> rusqlite::Result<ClusterStatus> {
    match s {
        "active" => Ok(ClusterStatus::Active),
        "inactive" => Ok(ClusterStatus::Inactive),
        "error" => Ok(ClusterStatus::Error),
        other => Err(rusqlite::Error::InvalidColumnType(0, other.to_string(), rusqlite::types::Type::Text)),
    }
}

fn row_to_cluster(row: &Row<'_>) -> rusqlite::Result<Cluster> {
    let kind_str: String = row.get("kind")?;
    let status_str: String = row.get("status")?;
    let connection_config_json: String = row.get("connection_config")?;
    let resources_json: String = row.get("available_resources")?;

    Ok(Cluster {
        id: ClusterId::new(row.get("id")?),
        name: row.get("name")?,
        kind: kind_from_str(&kind_str)?,
        host: row.get("host")?,
        port: row.get::<_, i64>("port")? as u16,
        user: row.get("user")?,
        connection_config: serde_json::from_str(&connection_config_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        status: status_from_str(&status_str)?,
        max_concurrent: row.get::<_, i64>("max_concurrent")? as u32,
        available_resources: serde_json::from_str::<ResourceMap>(&resources_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
    })
}

impl Store {
    pub fn create_cluster(&self, config: ClusterConfig) -> StoreResult<ClusterId> {
        let conn = self.conn.lock();
        let connection_config_json = serde_json::to_string(&config.connection_config)?;
        let resources_json = serde_json::to_string(&config.available_resources)?;
        conn.execute(
            "INSERT INTO Clusters (name, kind, host, port, user, connection_config, status, max_concurrent, available_resources)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?8)",
            params![
                config.name,
                kind_to_str(config.kind),
                config.host,
                config.port,
                config.user,
                connection_config_json,
                config.max_concurrent,
                resources_json,
            ],
        )?;
        let id = ClusterId::new(conn.last_insert_rowid());
        conn.execute("INSERT INTO ClusterState (cluster_id, running_jobs) VALUES (?1, 0)", params![id.get()])?;
        Ok(id)
    }

    pub fn get_cluster(&self, id: ClusterId) -> StoreResult<Option<Cluster>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM Clusters WHERE id = ?1", params![id.get()], row_to_cluster)
            .optional()
            .map_err(Into::into)
    }

    pub fn list_clusters(&self) -> StoreResult<Vec<Cluster>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM Clusters ORDER BY id")?;
        let rows = stmt.query_map([], row_to_cluster)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn update_cluster_status(&self, id: ClusterId, status: ClusterStatus) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("UPDATE Clusters SET status = ?1 WHERE id = ?2", params![status_to_str(status), id.get()])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "Cluster", id: id.get() });
        }
        Ok(())
    }

    pub fn update_cluster_resources(&self, id: ClusterId, resources: &ResourceMap) -> StoreResult<()> {
        let conn = self.conn.lock();
        let resources_json = serde_json::to_string(resources)?;
        let changed =
            conn.execute("UPDATE Clusters SET available_resources = ?1 WHERE id = ?2", params![resources_json, id.get()])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "Cluster", id: id.get() });
        }
        Ok(())
    }

    /// Refuses to delete a cluster with any job in a non-terminal status.
    pub fn delete_cluster(&self, id: ClusterId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let non_terminal: i64 = conn.query_row(
            "SELECT count(*) FROM Jobs WHERE cluster_id = ?1 AND status NOT IN ('completed', 'failed', 'cancelled')",
            params![id.get()],
            |row| row.get(0),
        )?;
        if non_terminal > 0 {
            return Err(StoreError::ClusterHasActiveJobs { cluster_id: id.get() });
        }
        let changed = conn.execute("DELETE FROM Clusters WHERE id = ?1", params![id.get()])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "Cluster", id: id.get() });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "clusters_tests.rs"]
mod tests;
