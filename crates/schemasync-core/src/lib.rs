//! # schemasync-core
//!
//! Structural comparison of two MySQL schemas and generation of the DDL that
//! brings one in line with the other.
//!
//! The pipeline has three stages:
//!
//! - **Diff** - [`compare_schemas`] matches tables, columns, indexes and
//!   constraints by name and returns a [`SchemaDiff`].
//! - **Plan** - [`Planner::plan`] turns the diff into a [`MigrationPlan`]
//!   ordered so that no statement depends on something a later statement
//!   creates (drops first, foreign keys last).
//! - **SQL** - [`SqlGenerator`] renders each change as one back-tick quoted
//!   MySQL statement.
//!
//! ```rust
//! use schemasync_core::prelude::*;
//!
//! let source = Schema::new("app").table(
//!     Table::new("users")
//!         .column(Column::new("id", "INT").auto_increment())
//!         .column(Column::new("email", "VARCHAR(255)").nullable())
//!         .index(Index::primary(["id"])),
//! );
//! let target = Schema::new("app");
//!
//! let diff = compare_schemas(&source, &target).unwrap();
//! let plan = Planner::new().plan(&diff).unwrap();
//!
//! assert_eq!(
//!     plan.statements()[0].sql,
//!     "CREATE TABLE `users` (`id` INT NOT NULL AUTO_INCREMENT, \
//!      `email` VARCHAR(255) NULL, PRIMARY KEY (`id`))"
//! );
//! ```
//!
//! Nothing in this crate performs I/O. Connecting to servers, extracting
//! schemas and executing plans is done by the `schemasync` crate.

pub mod diff;
pub mod error;
pub mod plan;
pub mod planner;
pub mod schema;
pub mod sqlgen;

pub use diff::{compare_schemas, ColumnDiff, DiffCounts, SchemaDiff, TableDiff};
pub use error::{classify_message, ErrorKind, Result, SyncError};
pub use plan::{MigrationPlan, MigrationStatement, MigrationSummary, StatementType};
pub use planner::Planner;
pub use schema::{Column, Constraint, ConstraintKind, Index, Schema, Table};
pub use sqlgen::{SchemaChange, SqlGenerator};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::diff::{compare_schemas, ColumnDiff, SchemaDiff, TableDiff};
    pub use crate::error::{ErrorKind, Result, SyncError};
    pub use crate::plan::{MigrationPlan, MigrationStatement, MigrationSummary, StatementType};
    pub use crate::planner::Planner;
    pub use crate::schema::{Column, Constraint, ConstraintKind, Index, Schema, Table};
    pub use crate::sqlgen::{SchemaChange, SqlGenerator};
}
