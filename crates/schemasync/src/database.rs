//! Capabilities the orchestrator relies on.
//!
//! The orchestrator never opens a transport itself; it goes through a
//! [`Database`] for connections and statement execution and a
//! [`SchemaExtractor`] for snapshots. Implementations include the `sqlx`
//! backed [`crate::mysql::MySqlDatabase`] and the file based
//! [`crate::snapshot::SnapshotExtractor`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use schemasync_core::error::Result;
use schemasync_core::schema::Schema;

use crate::config::DatabaseConfig;

/// Side of a synchronization a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The database holding the desired schema.
    Source,
    /// The database being changed.
    Target,
}

impl Role {
    /// Lowercase name, as used in logs and error context.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Source => "source",
            Role::Target => "target",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database access.
#[async_trait]
pub trait Database: Send + Sync {
    /// Handle to one open connection.
    type Connection: Send + Sync;

    /// Opens a connection.
    async fn connect(&self, config: &DatabaseConfig) -> Result<Self::Connection>;

    /// Checks that the connection is usable.
    async fn test_connection(&self, connection: &Self::Connection) -> Result<()>;

    /// Closes the connection.
    async fn close(&self, connection: &Self::Connection) -> Result<()>;

    /// Executes statements in order. Either all of them take effect or the
    /// error is returned after whatever transaction was opened is resolved.
    async fn execute_sql(&self, connection: &Self::Connection, statements: &[String])
        -> Result<()>;
}

/// Schema extraction over a connection of type `C`.
#[async_trait]
pub trait SchemaExtractor<C: Send + Sync>: Send + Sync {
    /// Extracts the schema of `database`.
    async fn extract_schema(&self, connection: &C, database: &str) -> Result<Schema>;

    /// Extracts the schema of `database` on the `role` side of a run.
    ///
    /// The orchestrator calls this one. Extractors that can tell two
    /// databases with the same name apart by role override it.
    async fn extract_role_schema(
        &self,
        connection: &C,
        _role: Role,
        database: &str,
    ) -> Result<Schema> {
        self.extract_schema(connection, database).await
    }
}

#[async_trait]
impl<D: Database + ?Sized> Database for Arc<D> {
    type Connection = D::Connection;

    async fn connect(&self, config: &DatabaseConfig) -> Result<Self::Connection> {
        (**self).connect(config).await
    }

    async fn test_connection(&self, connection: &Self::Connection) -> Result<()> {
        (**self).test_connection(connection).await
    }

    async fn close(&self, connection: &Self::Connection) -> Result<()> {
        (**self).close(connection).await
    }

    async fn execute_sql(
        &self,
        connection: &Self::Connection,
        statements: &[String],
    ) -> Result<()> {
        (**self).execute_sql(connection, statements).await
    }
}

#[async_trait]
impl<C: Send + Sync, E: SchemaExtractor<C> + ?Sized> SchemaExtractor<C> for Arc<E> {
    async fn extract_schema(&self, connection: &C, database: &str) -> Result<Schema> {
        (**self).extract_schema(connection, database).await
    }

    async fn extract_role_schema(
        &self,
        connection: &C,
        role: Role,
        database: &str,
    ) -> Result<Schema> {
        (**self).extract_role_schema(connection, role, database).await
    }
}
