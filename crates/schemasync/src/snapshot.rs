//! JSON schema snapshots.
//!
//! A snapshot is a [`Schema`] serialized with `serde_json`. The
//! [`SnapshotExtractor`] serves snapshots registered per role or per database
//! name, which lets a run (or a test) work from files instead of live
//! introspection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use schemasync_core::error::{Result, SyncError};
use schemasync_core::schema::Schema;

use crate::classify::classify_io_error;
use crate::database::{Role, SchemaExtractor};

/// Reads a snapshot file.
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| classify_io_error(&e).with_context("path", path.display()).with_source(e))?;

    serde_json::from_str(&text).map_err(|e| {
        SyncError::validation(format!("invalid snapshot {}: {e}", path.display()))
            .with_context("path", path.display())
            .with_source(e)
    })
}

/// Writes a snapshot file as pretty-printed JSON.
pub async fn save_snapshot(schema: &Schema, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(schema).map_err(|e| {
        SyncError::validation(format!("cannot serialize schema `{}`: {e}", schema.name))
            .with_source(e)
    })?;

    tokio::fs::write(path, json)
        .await
        .map_err(|e| classify_io_error(&e).with_context("path", path.display()).with_source(e))
}

/// Extractor that serves snapshot files by role or by database name.
///
/// A snapshot registered for a role wins over one registered for the
/// database name, so a source and a target sharing a name stay apart.
#[derive(Debug, Clone, Default)]
pub struct SnapshotExtractor {
    snapshots: HashMap<String, PathBuf>,
    roles: HashMap<Role, PathBuf>,
}

impl SnapshotExtractor {
    /// Creates an extractor with no snapshots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the snapshot file for `database`, replacing any previous one.
    #[must_use]
    pub fn register(mut self, database: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.snapshots.insert(database.into(), path.into());
        self
    }

    /// Registers the snapshot file for one side of a run.
    #[must_use]
    pub fn register_role(mut self, role: Role, path: impl Into<PathBuf>) -> Self {
        self.roles.insert(role, path.into());
        self
    }

    /// Returns the snapshot path registered for `database`.
    #[must_use]
    pub fn path_for(&self, database: &str) -> Option<&Path> {
        self.snapshots.get(database).map(PathBuf::as_path)
    }

    /// Returns the snapshot path registered for `role`.
    #[must_use]
    pub fn path_for_role(&self, role: Role) -> Option<&Path> {
        self.roles.get(&role).map(PathBuf::as_path)
    }
}

async fn load_for(path: &Path, database: &str) -> Result<Schema> {
    debug!(database, path = %path.display(), "Loading snapshot");
    let schema = load_snapshot(path).await?;
    if schema.name != database {
        warn!(
            database,
            snapshot = %schema.name,
            "Snapshot was taken from a differently named database"
        );
    }
    Ok(schema)
}

#[async_trait]
impl<C: Send + Sync> SchemaExtractor<C> for SnapshotExtractor {
    async fn extract_schema(&self, _connection: &C, database: &str) -> Result<Schema> {
        let path = self.path_for(database).ok_or_else(|| {
            SyncError::schema(format!("no snapshot registered for database `{database}`"))
                .with_context("database", database)
        })?;
        load_for(path, database).await
    }

    async fn extract_role_schema(
        &self,
        connection: &C,
        role: Role,
        database: &str,
    ) -> Result<Schema> {
        match self.path_for_role(role) {
            Some(path) => load_for(path, database).await,
            None => self.extract_schema(connection, database).await,
        }
    }
}
