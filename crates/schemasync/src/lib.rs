//! # schemasync
//!
//! Runs schema synchronizations between two MySQL databases: connects to both,
//! extracts their schemas, plans the migration with [`schemasync_core`], and
//! executes it statement by statement with retries and cancellation.
//!
//! ```rust,no_run
//! use schemasync::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let config = SyncConfig::new(
//!     DatabaseConfig::new("mysql://root@prod/app", "app"),
//!     DatabaseConfig::new("mysql://root@staging/app", "app_staging"),
//! )
//! .dry_run(true);
//!
//! let extractor = SnapshotExtractor::new()
//!     .register_role(Role::Source, "prod.json")
//!     .register_role(Role::Target, "staging.json");
//!
//! let orchestrator = SyncOrchestrator::new(config, MySqlDatabase::new(), extractor);
//! let result = orchestrator.run(&CancellationToken::new()).await;
//! if let Some(plan) = &result.plan {
//!     println!("{}", plan.to_sql_script());
//! }
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod database;
pub mod mysql;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod snapshot;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{DatabaseConfig, SyncArgs, SyncConfig};
    pub use crate::database::{Database, Role, SchemaExtractor};
    pub use crate::mysql::MySqlDatabase;
    pub use crate::orchestrator::{ExecutionResult, SyncOrchestrator};
    pub use crate::progress::{ProgressReporter, SyncPhase, TracingReporter};
    pub use crate::retry::RetryPolicy;
    pub use crate::snapshot::SnapshotExtractor;
    pub use schemasync_core::prelude::*;
}
