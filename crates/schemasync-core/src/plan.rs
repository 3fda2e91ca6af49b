//! Migration plan types.
//!
//! A [`MigrationPlan`] is an ordered list of [`MigrationStatement`]s plus the
//! warnings collected while planning. Its [`MigrationSummary`] is derived from
//! the statements and recomputed on every mutation.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Kind of DDL statement, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    /// ALTER TABLE ... DROP FOREIGN KEY / INDEX / CHECK.
    DropConstraint,
    /// DROP INDEX.
    DropIndex,
    /// ALTER TABLE ... DROP COLUMN.
    DropColumn,
    /// DROP TABLE.
    DropTable,
    /// CREATE TABLE.
    CreateTable,
    /// ALTER TABLE ... ADD COLUMN.
    AddColumn,
    /// ALTER TABLE ... MODIFY COLUMN.
    ModifyColumn,
    /// CREATE INDEX.
    CreateIndex,
    /// ALTER TABLE ... ADD CONSTRAINT.
    AddConstraint,
}

impl StatementType {
    /// All statement types in execution order.
    pub const ALL: [Self; 9] = [
        Self::DropConstraint,
        Self::DropIndex,
        Self::DropColumn,
        Self::DropTable,
        Self::CreateTable,
        Self::AddColumn,
        Self::ModifyColumn,
        Self::CreateIndex,
        Self::AddConstraint,
    ];

    /// Execution order key; lower runs first.
    ///
    /// Drops run before creates so nothing is dropped while still referenced,
    /// and constraints are added last so both ends of a foreign key exist.
    #[must_use]
    pub fn execution_order(&self) -> u8 {
        match self {
            Self::DropConstraint => 1,
            Self::DropIndex => 2,
            Self::DropColumn => 3,
            Self::DropTable => 4,
            Self::CreateTable => 5,
            Self::AddColumn => 6,
            Self::ModifyColumn => 7,
            Self::CreateIndex => 8,
            Self::AddConstraint => 9,
        }
    }

    /// Whether executing this kind of statement can lose data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropTable | Self::DropColumn | Self::DropIndex | Self::DropConstraint
        )
    }

    /// Returns the tag used in serialized plans.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropConstraint => "DROP_CONSTRAINT",
            Self::DropIndex => "DROP_INDEX",
            Self::DropColumn => "DROP_COLUMN",
            Self::DropTable => "DROP_TABLE",
            Self::CreateTable => "CREATE_TABLE",
            Self::AddColumn => "ADD_COLUMN",
            Self::ModifyColumn => "MODIFY_COLUMN",
            Self::CreateIndex => "CREATE_INDEX",
            Self::AddConstraint => "ADD_CONSTRAINT",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(SyncError::validation("statement type is empty"));
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SyncError::validation(format!("unrecognized statement type `{s}`")))
    }
}

/// One rendered DDL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatement {
    /// SQL text.
    pub sql: String,
    /// Statement kind.
    pub statement_type: StatementType,
    /// Human description.
    pub description: String,
    /// Mirrors `statement_type.is_destructive()`.
    pub is_destructive: bool,
    /// Table the statement touches.
    #[serde(default)]
    pub table: Option<String>,
    /// Objects this statement relies on; informational.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl MigrationStatement {
    /// Creates a statement; destructiveness follows from the type.
    #[must_use]
    pub fn new(
        statement_type: StatementType,
        sql: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            sql: sql.into(),
            statement_type,
            description: description.into(),
            is_destructive: statement_type.is_destructive(),
            table: None,
            dependencies: Vec::new(),
        }
    }

    /// Sets the owning table.
    #[must_use]
    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Adds a dependency name.
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// Checks the statement's own fields.
    pub fn validate(&self) -> Result<()> {
        if self.sql.trim().is_empty() {
            return Err(SyncError::validation("statement SQL is empty"));
        }
        if self.description.trim().is_empty() {
            return Err(SyncError::validation("statement description is empty"));
        }
        if self.is_destructive != self.statement_type.is_destructive() {
            return Err(SyncError::validation(format!(
                "statement of type {} has an inconsistent destructive flag",
                self.statement_type
            )));
        }
        Ok(())
    }
}

/// Counts derived from a plan's statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Number of statements.
    pub total_statements: usize,
    /// CREATE TABLE statements.
    pub tables_created: usize,
    /// DROP TABLE statements.
    pub tables_dropped: usize,
    /// Distinct tables touched by column statements.
    pub tables_modified: usize,
    /// ADD COLUMN statements.
    pub columns_added: usize,
    /// DROP COLUMN statements.
    pub columns_dropped: usize,
    /// MODIFY COLUMN statements.
    pub columns_modified: usize,
    /// CREATE INDEX statements.
    pub indexes_created: usize,
    /// DROP INDEX statements.
    pub indexes_dropped: usize,
    /// ADD CONSTRAINT statements.
    pub constraints_added: usize,
    /// DROP CONSTRAINT statements.
    pub constraints_dropped: usize,
    /// Statements that can lose data.
    pub destructive_statements: usize,
}

impl MigrationSummary {
    /// Computes the summary of a statement list.
    #[must_use]
    pub fn from_statements(statements: &[MigrationStatement]) -> Self {
        let mut summary = Self {
            total_statements: statements.len(),
            ..Self::default()
        };
        let mut modified_tables: BTreeSet<&str> = BTreeSet::new();

        for statement in statements {
            match statement.statement_type {
                StatementType::CreateTable => summary.tables_created += 1,
                StatementType::DropTable => summary.tables_dropped += 1,
                StatementType::AddColumn => summary.columns_added += 1,
                StatementType::DropColumn => summary.columns_dropped += 1,
                StatementType::ModifyColumn => summary.columns_modified += 1,
                StatementType::CreateIndex => summary.indexes_created += 1,
                StatementType::DropIndex => summary.indexes_dropped += 1,
                StatementType::AddConstraint => summary.constraints_added += 1,
                StatementType::DropConstraint => summary.constraints_dropped += 1,
            }
            if matches!(
                statement.statement_type,
                StatementType::AddColumn | StatementType::DropColumn | StatementType::ModifyColumn
            ) {
                if let Some(table) = statement.table.as_deref() {
                    modified_tables.insert(table);
                }
            }
            if statement.statement_type.is_destructive() {
                summary.destructive_statements += 1;
            }
        }

        summary.tables_modified = modified_tables.len();
        summary
    }
}

/// An ordered set of statements ready for validation and execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PlanRecord")]
pub struct MigrationPlan {
    statements: Vec<MigrationStatement>,
    warnings: Vec<String>,
    summary: MigrationSummary,
}

/// Persisted form of a plan; the summary is always recomputed on load.
#[derive(Deserialize)]
struct PlanRecord {
    #[serde(default)]
    statements: Vec<MigrationStatement>,
    #[serde(default)]
    warnings: Vec<String>,
}

impl From<PlanRecord> for MigrationPlan {
    fn from(record: PlanRecord) -> Self {
        let summary = MigrationSummary::from_statements(&record.statements);
        Self {
            statements: record.statements,
            warnings: record.warnings,
            summary,
        }
    }
}

impl MigrationPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement and recomputes the summary.
    pub fn push(&mut self, statement: MigrationStatement) {
        self.statements.push(statement);
        self.summary = MigrationSummary::from_statements(&self.statements);
    }

    /// Records a warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Returns the statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[MigrationStatement] {
        &self.statements
    }

    /// Returns the warnings.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Returns the derived summary.
    #[must_use]
    pub fn summary(&self) -> &MigrationSummary {
        &self.summary
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the plan has no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether any statement can lose data.
    #[must_use]
    pub fn has_destructive_operations(&self) -> bool {
        self.summary.destructive_statements > 0
    }

    /// Renders the plan as a script with one `;`-terminated statement per
    /// line, each destructive statement preceded by a warning comment.
    #[must_use]
    pub fn to_sql_script(&self) -> String {
        let mut script = String::new();
        for statement in &self.statements {
            if statement.is_destructive {
                script.push_str("-- WARNING: ");
                script.push_str(&statement.description);
                script.push('\n');
            }
            script.push_str(&statement.sql);
            script.push_str(";\n");
        }
        script
    }
}
