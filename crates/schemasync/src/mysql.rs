//! MySQL backend on top of `sqlx`.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::{debug, info, warn};

use schemasync_core::error::Result;

use crate::classify::classify_sqlx_error;
use crate::config::DatabaseConfig;
use crate::database::Database;

/// [`Database`] implementation for MySQL servers.
///
/// Each connection is a pool limited to a single connection, so every
/// statement of a run goes over the same session.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDatabase;

impl MySqlDatabase {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    type Connection = MySqlPool;

    async fn connect(&self, config: &DatabaseConfig) -> Result<MySqlPool> {
        debug!(url = %config.redacted_url(), database = %config.database, "Opening pool");
        MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| classify_sqlx_error(e).with_context("database", &config.database))
    }

    async fn test_connection(&self, pool: &MySqlPool) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(classify_sqlx_error)
    }

    async fn close(&self, pool: &MySqlPool) -> Result<()> {
        pool.close().await;
        Ok(())
    }

    async fn execute_sql(&self, pool: &MySqlPool, statements: &[String]) -> Result<()> {
        let mut tx = pool.begin().await.map_err(classify_sqlx_error)?;

        for (i, sql) in statements.iter().enumerate() {
            debug!(sql = %sql, "Executing");
            if let Err(err) = sqlx::query(sql).execute(&mut *tx).await {
                let err = classify_sqlx_error(err)
                    .with_context("batch_index", i + 1)
                    .with_context("sql", sql);
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(err);
            }
        }

        tx.commit().await.map_err(classify_sqlx_error)?;
        info!(count = statements.len(), "Committed");
        Ok(())
    }
}
