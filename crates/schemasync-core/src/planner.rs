//! Migration planner.
//!
//! Turns a [`SchemaDiff`] into a [`MigrationPlan`] whose statements are sorted
//! by [`StatementType::execution_order`], and validates plans before they are
//! executed.

use crate::diff::SchemaDiff;
use crate::error::{Result, SyncError};
use crate::plan::{MigrationPlan, MigrationStatement, StatementType};
use crate::sqlgen::{SchemaChange, SqlGenerator};

/// Builds and validates migration plans.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    generator: SqlGenerator,
}

impl Planner {
    /// Creates a planner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the SQL generator in use.
    #[must_use]
    pub fn generator(&self) -> &SqlGenerator {
        &self.generator
    }

    /// Plans the statements needed to apply `diff`.
    ///
    /// Statements are stably sorted by execution order, so changes of the
    /// same type keep the order in which the diff lists them.
    pub fn plan(&self, diff: &SchemaDiff) -> Result<MigrationPlan> {
        let mut statements = Vec::new();

        for table in &diff.added_tables {
            statements.push(self.statement(&SchemaChange::CreateTable(table))?);
        }
        for table in &diff.removed_tables {
            statements.push(self.statement(&SchemaChange::DropTable(table))?);
        }
        for table_diff in &diff.modified_tables {
            let table = table_diff.name.as_str();
            for column in &table_diff.added_columns {
                statements.push(self.statement(&SchemaChange::AddColumn { table, column })?);
            }
            for column in &table_diff.removed_columns {
                statements.push(self.statement(&SchemaChange::DropColumn { table, column })?);
            }
            for column_diff in &table_diff.modified_columns {
                statements.push(self.statement(&SchemaChange::ModifyColumn {
                    table,
                    diff: column_diff,
                })?);
            }
            for constraint in &table_diff.removed_constraints {
                statements.push(self.statement(&SchemaChange::DropConstraint(constraint))?);
            }
            for constraint in &table_diff.added_constraints {
                statements.push(self.statement(&SchemaChange::AddConstraint(constraint))?);
            }
        }
        for index in &diff.removed_indexes {
            statements.push(self.statement(&SchemaChange::DropIndex(index))?);
        }
        for index in &diff.added_indexes {
            statements.push(self.statement(&SchemaChange::CreateIndex(index))?);
        }
        for constraint in &diff.removed_constraints {
            statements.push(self.statement(&SchemaChange::DropConstraint(constraint))?);
        }
        for constraint in &diff.added_constraints {
            statements.push(self.statement(&SchemaChange::AddConstraint(constraint))?);
        }

        statements.sort_by_key(|s| s.statement_type.execution_order());

        let mut plan = MigrationPlan::new();
        for statement in statements {
            if statement.is_destructive {
                plan.add_warning(destructive_warning(&statement));
            }
            plan.push(statement);
        }
        for table_diff in &diff.modified_tables {
            for column in &table_diff.modified_columns {
                if column.type_changed() {
                    plan.add_warning(format!(
                        "Changing column `{}`.`{}` from {} to {} may truncate or fail to \
                         convert existing values",
                        table_diff.name, column.name, column.old.data_type, column.new.data_type
                    ));
                }
                if column.becomes_not_null() && column.new.default.is_none() {
                    plan.add_warning(format!(
                        "Column `{}`.`{}` becomes NOT NULL without a default; existing NULL \
                         values will make the change fail",
                        table_diff.name, column.name
                    ));
                }
            }
        }

        Ok(plan)
    }

    /// Checks that a plan is executable.
    ///
    /// Fails on an empty plan or on the first statement whose own fields are
    /// invalid; the error carries the statement's 1-based index.
    pub fn validate(&self, plan: &MigrationPlan) -> Result<()> {
        if plan.is_empty() {
            return Err(SyncError::validation("migration plan has no statements"));
        }
        for (i, statement) in plan.statements().iter().enumerate() {
            statement.validate().map_err(|e| {
                SyncError::validation(format!("statement {}: {}", i + 1, e.message()))
                    .with_context("statement_index", i + 1)
                    .with_context("statement_type", statement.statement_type)
            })?;
        }
        Ok(())
    }

    fn statement(&self, change: &SchemaChange<'_>) -> Result<MigrationStatement> {
        let sql = self.generator.generate(change)?;
        let statement_type = change.statement_type();
        let table = change.table_name();
        let statement = MigrationStatement::new(statement_type, sql, describe(change))
            .on_table(table);

        Ok(match change {
            SchemaChange::AddConstraint(constraint) => match constraint.referenced_table() {
                Some(referenced) => statement.depends_on(table).depends_on(referenced),
                None => statement.depends_on(table),
            },
            SchemaChange::CreateTable(_) | SchemaChange::DropTable(_) => statement,
            _ => statement.depends_on(table),
        })
    }
}

fn describe(change: &SchemaChange<'_>) -> String {
    match change {
        SchemaChange::CreateTable(table) => format!("Create table `{}`", table.name),
        SchemaChange::DropTable(table) => format!("Drop table `{}`", table.name),
        SchemaChange::AddColumn { table, column } => {
            format!("Add column `{}` to table `{}`", column.name, table)
        }
        SchemaChange::DropColumn { table, column } => {
            format!("Drop column `{}` from table `{}`", column.name, table)
        }
        SchemaChange::ModifyColumn { table, diff } => {
            format!("Modify column `{}` in table `{}`", diff.name, table)
        }
        SchemaChange::CreateIndex(index) if index.primary => {
            format!("Add primary key on table `{}`", index.table)
        }
        SchemaChange::CreateIndex(index) => {
            format!("Create index `{}` on table `{}`", index.name, index.table)
        }
        SchemaChange::DropIndex(index) if index.primary => {
            format!("Drop primary key on table `{}`", index.table)
        }
        SchemaChange::DropIndex(index) => {
            format!("Drop index `{}` on table `{}`", index.name, index.table)
        }
        SchemaChange::AddConstraint(constraint) => format!(
            "Add {} constraint `{}` to table `{}`",
            constraint.kind.as_str(),
            constraint.name,
            constraint.table
        ),
        SchemaChange::DropConstraint(constraint) => format!(
            "Drop {} constraint `{}` from table `{}`",
            constraint.kind.as_str(),
            constraint.name,
            constraint.table
        ),
    }
}

fn destructive_warning(statement: &MigrationStatement) -> String {
    let table = statement.table.as_deref().unwrap_or("?");
    match statement.statement_type {
        StatementType::DropTable => format!(
            "Dropping table `{table}` will result in permanent data loss of all its rows"
        ),
        StatementType::DropColumn => format!(
            "{} will result in data loss for every row of `{table}`",
            statement.description
        ),
        StatementType::DropIndex => format!(
            "{} may slow down queries and removes any uniqueness it enforced",
            statement.description
        ),
        StatementType::DropConstraint => format!(
            "{} removes an integrity rule; data violating it may be written afterwards",
            statement.description
        ),
        _ => statement.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{compare_schemas, ColumnDiff, TableDiff};
    use crate::error::ErrorKind;
    use crate::schema::{Column, Constraint, Index, Schema, Table};

    fn planner() -> Planner {
        Planner::new()
    }

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "INT").auto_increment())
            .column(Column::new("email", "VARCHAR(255)").nullable())
            .index(Index::primary(["id"]))
    }

    fn orders() -> Table {
        Table::new("orders")
            .column(Column::new("id", "INT").auto_increment())
            .column(Column::new("user_id", "INT"))
            .index(Index::primary(["id"]))
            .index(Index::new("idx_user_id", ["user_id"]))
            .constraint(
                Constraint::foreign_key("fk_user_id", ["user_id"], "users", ["id"])
                    .on_update("CASCADE")
                    .on_delete("RESTRICT"),
            )
    }

    fn assert_ordered(plan: &MigrationPlan) {
        for pair in plan.statements().windows(2) {
            assert!(
                pair[0].statement_type.execution_order()
                    <= pair[1].statement_type.execution_order(),
                "{} must not run before {}",
                pair[0].statement_type,
                pair[1].statement_type
            );
        }
    }

    #[test]
    fn test_new_tables_get_foreign_keys_last() {
        let source = Schema::new("app").table(users()).table(orders());
        let diff = compare_schemas(&source, &Schema::new("app")).unwrap();
        let plan = planner().plan(&diff).unwrap();

        let types: Vec<StatementType> =
            plan.statements().iter().map(|s| s.statement_type).collect();
        assert_eq!(
            types,
            vec![
                StatementType::CreateTable,
                StatementType::CreateTable,
                StatementType::CreateIndex,
                StatementType::AddConstraint,
            ]
        );
        let fk = &plan.statements()[3];
        assert_eq!(
            fk.sql,
            "ALTER TABLE `orders` ADD CONSTRAINT `fk_user_id` FOREIGN KEY (`user_id`) \
             REFERENCES `users` (`id`) ON UPDATE CASCADE ON DELETE RESTRICT"
        );
        assert_eq!(fk.dependencies, vec!["orders", "users"]);
        assert!(plan.warnings().is_empty());
        assert!(!plan.has_destructive_operations());
    }

    #[test]
    fn test_mixed_changes_are_totally_ordered() {
        let target = Schema::new("app")
            .table(
                users()
                    .column(Column::new("legacy", "TEXT").nullable())
                    .index(Index::new("idx_email", ["email"])),
            )
            .table(orders())
            .table(Table::new("sessions").column(Column::new("id", "CHAR(36)")));
        let source = Schema::new("app")
            .table(
                Table::new("users")
                    .column(Column::new("id", "INT").auto_increment())
                    .column(Column::new("email", "VARCHAR(320)"))
                    .column(Column::new("name", "VARCHAR(100)").nullable())
                    .index(Index::primary(["id"]))
                    .index(Index::unique("idx_email", ["email"])),
            )
            .table(
                Table::new("orders")
                    .column(Column::new("id", "INT").auto_increment())
                    .column(Column::new("user_id", "INT"))
                    .index(Index::primary(["id"]))
                    .index(Index::new("idx_user_id", ["user_id"])),
            )
            .table(Table::new("audit_log").column(Column::new("id", "BIGINT")));

        let diff = compare_schemas(&source, &target).unwrap();
        let plan = planner().plan(&diff).unwrap();
        assert_ordered(&plan);

        let summary = plan.summary();
        assert_eq!(summary.tables_created, 1);
        assert_eq!(summary.tables_dropped, 1);
        assert_eq!(summary.columns_added, 1);
        assert_eq!(summary.columns_dropped, 1);
        assert_eq!(summary.columns_modified, 1);
        assert_eq!(summary.indexes_dropped, 1);
        assert_eq!(summary.indexes_created, 1);
        assert_eq!(summary.constraints_dropped, 1);
        assert_eq!(summary.tables_modified, 1);
        assert_eq!(summary.destructive_statements, 4);

        assert_eq!(plan.statements()[0].statement_type, StatementType::DropConstraint);
        assert_eq!(
            plan.statements()[0].sql,
            "ALTER TABLE `orders` DROP FOREIGN KEY `fk_user_id`"
        );
    }

    #[test]
    fn test_destructive_statements_produce_warnings() {
        let target = Schema::new("app").table(users()).table(orders());
        let source = Schema::new("app").table(
            Table::new("users")
                .column(Column::new("id", "INT").auto_increment())
                .index(Index::primary(["id"])),
        );

        let plan = planner().plan(&compare_schemas(&source, &target).unwrap()).unwrap();
        for statement in plan.statements() {
            assert_eq!(statement.is_destructive, statement.statement_type.is_destructive());
        }
        assert!(plan.has_destructive_operations());
        assert_eq!(plan.warnings().len(), plan.summary().destructive_statements);
        assert!(plan
            .warnings()
            .iter()
            .any(|w| w.contains("column `email`") && w.contains("data loss")));
        assert!(plan
            .warnings()
            .iter()
            .any(|w| w.contains("table `orders`") && w.contains("permanent data loss")));
    }

    #[test]
    fn test_type_change_warning() {
        let mut table_diff = TableDiff::new("users");
        table_diff.modified_columns.push(ColumnDiff::new(
            Column::new("age", "BIGINT").nullable(),
            Column::new("age", "INT"),
        ));
        let diff = SchemaDiff {
            modified_tables: vec![table_diff],
            ..SchemaDiff::default()
        };

        let plan = planner().plan(&diff).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.statements()[0].sql,
            "ALTER TABLE `users` MODIFY COLUMN `age` INT NOT NULL"
        );
        assert!(!plan.has_destructive_operations());
        assert_eq!(plan.warnings().len(), 2);
        assert!(plan.warnings()[0].contains("from BIGINT to INT"));
        assert!(plan.warnings()[1].contains("NOT NULL"));
    }

    #[test]
    fn test_empty_diff_plans_nothing() {
        let plan = planner().plan(&SchemaDiff::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(
            planner().validate(&plan).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_generation_errors_propagate() {
        let diff = SchemaDiff {
            added_tables: vec![Table::new("no_columns")],
            ..SchemaDiff::default()
        };
        let err = planner().plan(&diff).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validate_rejects_empty_sql() {
        let mut plan = MigrationPlan::new();
        plan.push(MigrationStatement::new(
            StatementType::CreateTable,
            "",
            "Create table `t`",
        ));

        let err = planner().validate(&plan).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.context_value("statement_index"), Some("1"));
    }

    #[test]
    fn test_validate_accepts_planned_statements() {
        let source = Schema::new("app").table(users());
        let plan = planner()
            .plan(&compare_schemas(&source, &Schema::new("app")).unwrap())
            .unwrap();
        assert!(planner().validate(&plan).is_ok());
    }

    #[test]
    fn test_rollback_plan_from_reversed_diff() {
        let source = Schema::new("app").table(users()).table(orders());
        let target = Schema::new("app").table(users());

        let diff = compare_schemas(&source, &target).unwrap();
        let rollback = planner().plan(&diff.reversed()).unwrap();
        assert_ordered(&rollback);

        let sql: Vec<&str> = rollback.statements().iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE `orders` DROP FOREIGN KEY `fk_user_id`",
                "DROP TABLE `orders`",
            ]
        );
    }
}
