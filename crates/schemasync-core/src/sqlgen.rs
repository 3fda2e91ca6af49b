//! MySQL DDL generation.
//!
//! Each function renders exactly one statement from one schema object. The
//! rendered text is a stable contract: identifiers are back-tick quoted,
//! nullability is always explicit, and defaults are emitted as given.

use crate::diff::ColumnDiff;
use crate::error::{Result, SyncError};
use crate::plan::StatementType;
use crate::schema::{Column, Constraint, ConstraintKind, Index, Table};

/// A single schema change paired with the object it applies to.
///
/// Matching on this enum is exhaustive, so a new kind of change cannot be
/// planned until it can also be rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaChange<'a> {
    /// Create a table with its primary key and unique keys.
    CreateTable(&'a Table),
    /// Drop a table.
    DropTable(&'a Table),
    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: &'a str,
        /// New column.
        column: &'a Column,
    },
    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: &'a str,
        /// Column being dropped.
        column: &'a Column,
    },
    /// Redefine a column using the new definition.
    ModifyColumn {
        /// Table name.
        table: &'a str,
        /// Old and new definitions.
        diff: &'a ColumnDiff,
    },
    /// Create an index.
    CreateIndex(&'a Index),
    /// Drop an index.
    DropIndex(&'a Index),
    /// Add a named constraint.
    AddConstraint(&'a Constraint),
    /// Drop a named constraint.
    DropConstraint(&'a Constraint),
}

impl SchemaChange<'_> {
    /// Returns the statement type produced by this change.
    #[must_use]
    pub fn statement_type(&self) -> StatementType {
        match self {
            Self::CreateTable(_) => StatementType::CreateTable,
            Self::DropTable(_) => StatementType::DropTable,
            Self::AddColumn { .. } => StatementType::AddColumn,
            Self::DropColumn { .. } => StatementType::DropColumn,
            Self::ModifyColumn { .. } => StatementType::ModifyColumn,
            Self::CreateIndex(_) => StatementType::CreateIndex,
            Self::DropIndex(_) => StatementType::DropIndex,
            Self::AddConstraint(_) => StatementType::AddConstraint,
            Self::DropConstraint(_) => StatementType::DropConstraint,
        }
    }

    /// Returns the table the change applies to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::CreateTable(t) | Self::DropTable(t) => &t.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ModifyColumn { table, .. } => table,
            Self::CreateIndex(i) | Self::DropIndex(i) => &i.table,
            Self::AddConstraint(c) | Self::DropConstraint(c) => &c.table,
        }
    }
}

/// Generates MySQL DDL statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlGenerator;

impl SqlGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders the statement for a change.
    pub fn generate(&self, change: &SchemaChange<'_>) -> Result<String> {
        match change {
            SchemaChange::CreateTable(table) => self.create_table_sql(table),
            SchemaChange::DropTable(table) => self.drop_table_sql(table),
            SchemaChange::AddColumn { table, column } => self.add_column_sql(table, column),
            SchemaChange::DropColumn { table, column } => self.drop_column_sql(table, column),
            SchemaChange::ModifyColumn { table, diff } => self.modify_column_sql(table, diff),
            SchemaChange::CreateIndex(index) => self.create_index_sql(index),
            SchemaChange::DropIndex(index) => self.drop_index_sql(index),
            SchemaChange::AddConstraint(constraint) => self.add_constraint_sql(constraint),
            SchemaChange::DropConstraint(constraint) => self.drop_constraint_sql(constraint),
        }
    }

    /// Quotes an identifier with back-ticks, doubling embedded back-ticks.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders `` `name` TYPE NULL|NOT NULL [DEFAULT v] [EXTRA] ``.
    pub fn column_definition(&self, column: &Column) -> Result<String> {
        require(&column.name, "column name")?;
        if column.data_type.trim().is_empty() {
            return Err(SyncError::validation(format!(
                "column `{}` has no data type",
                column.name
            )));
        }

        let mut parts = vec![
            self.quote_identifier(&column.name),
            column.data_type.clone(),
            if column.nullable { "NULL" } else { "NOT NULL" }.to_string(),
        ];
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {default}"));
        }
        if !column.extra.trim().is_empty() {
            parts.push(column.extra.trim().to_string());
        }
        Ok(parts.join(" "))
    }

    /// Generates CREATE TABLE.
    pub fn create_table_sql(&self, table: &Table) -> Result<String> {
        require(&table.name, "table name")?;
        if table.columns.is_empty() {
            return Err(SyncError::validation(format!(
                "table `{}` has no columns",
                table.name
            )));
        }

        let mut definitions = table
            .ordered_columns()
            .into_iter()
            .map(|c| self.column_definition(c))
            .collect::<Result<Vec<_>>>()?;

        if let Some(pk) = table.primary_key() {
            definitions.push(format!("PRIMARY KEY ({})", self.quote_list(&pk.columns)));
        }
        for index in table.indexes.iter().filter(|i| i.unique && !i.primary) {
            definitions.push(format!(
                "UNIQUE KEY {} ({})",
                self.quote_identifier(&index.name),
                self.quote_list(&index.columns)
            ));
        }

        Ok(format!(
            "CREATE TABLE {} ({})",
            self.quote_identifier(&table.name),
            definitions.join(", ")
        ))
    }

    /// Generates DROP TABLE.
    pub fn drop_table_sql(&self, table: &Table) -> Result<String> {
        require(&table.name, "table name")?;
        Ok(format!("DROP TABLE {}", self.quote_identifier(&table.name)))
    }

    /// Generates ALTER TABLE ... ADD COLUMN.
    pub fn add_column_sql(&self, table: &str, column: &Column) -> Result<String> {
        require(table, "table name")?;
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column)?
        ))
    }

    /// Generates ALTER TABLE ... DROP COLUMN.
    pub fn drop_column_sql(&self, table: &str, column: &Column) -> Result<String> {
        require(table, "table name")?;
        require(&column.name, "column name")?;
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(&column.name)
        ))
    }

    /// Generates ALTER TABLE ... MODIFY COLUMN from the new definition.
    pub fn modify_column_sql(&self, table: &str, diff: &ColumnDiff) -> Result<String> {
        require(table, "table name")?;
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(&diff.new)?
        ))
    }

    /// Generates CREATE [UNIQUE] INDEX, or ADD PRIMARY KEY for the primary index.
    pub fn create_index_sql(&self, index: &Index) -> Result<String> {
        require(&index.table, "index table name")?;
        require(&index.name, "index name")?;
        if index.columns.is_empty() {
            return Err(SyncError::validation(format!(
                "index `{}` has no columns",
                index.name
            )));
        }

        if index.primary {
            return Ok(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                self.quote_identifier(&index.table),
                self.quote_list(&index.columns)
            ));
        }

        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_identifier(&index.table));
        sql.push_str(" (");
        sql.push_str(&self.quote_list(&index.columns));
        sql.push(')');
        Ok(sql)
    }

    /// Generates DROP INDEX, or DROP PRIMARY KEY for the primary index.
    pub fn drop_index_sql(&self, index: &Index) -> Result<String> {
        require(&index.table, "index table name")?;
        if index.primary {
            return Ok(format!(
                "ALTER TABLE {} DROP PRIMARY KEY",
                self.quote_identifier(&index.table)
            ));
        }
        require(&index.name, "index name")?;
        Ok(format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(&index.name),
            self.quote_identifier(&index.table)
        ))
    }

    /// Generates ALTER TABLE ... ADD CONSTRAINT.
    pub fn add_constraint_sql(&self, constraint: &Constraint) -> Result<String> {
        require(&constraint.table, "constraint table name")?;
        require(&constraint.name, "constraint name")?;

        let body = match &constraint.kind {
            ConstraintKind::Unique => {
                self.require_columns(constraint)?;
                format!("UNIQUE ({})", self.quote_list(&constraint.columns))
            }
            ConstraintKind::ForeignKey {
                referenced_table,
                referenced_columns,
                on_update,
                on_delete,
            } => {
                self.require_columns(constraint)?;
                require(referenced_table, "referenced table name")?;
                if referenced_columns.is_empty() {
                    return Err(SyncError::validation(format!(
                        "foreign key `{}` has no referenced columns",
                        constraint.name
                    )));
                }
                let mut body = format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.quote_list(&constraint.columns),
                    self.quote_identifier(referenced_table),
                    self.quote_list(referenced_columns)
                );
                if let Some(action) = on_update.as_deref().filter(|a| !a.is_empty()) {
                    body.push_str(" ON UPDATE ");
                    body.push_str(action);
                }
                if let Some(action) = on_delete.as_deref().filter(|a| !a.is_empty()) {
                    body.push_str(" ON DELETE ");
                    body.push_str(action);
                }
                body
            }
            ConstraintKind::Check { expression } => {
                require(expression, "check expression")?;
                format!("CHECK ({expression})")
            }
        };

        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.quote_identifier(&constraint.table),
            self.quote_identifier(&constraint.name),
            body
        ))
    }

    /// Generates the kind-specific drop: DROP FOREIGN KEY, DROP INDEX (unique)
    /// or DROP CHECK.
    pub fn drop_constraint_sql(&self, constraint: &Constraint) -> Result<String> {
        require(&constraint.table, "constraint table name")?;
        require(&constraint.name, "constraint name")?;

        let clause = match constraint.kind {
            ConstraintKind::ForeignKey { .. } => "DROP FOREIGN KEY",
            ConstraintKind::Unique => "DROP INDEX",
            ConstraintKind::Check { .. } => "DROP CHECK",
        };
        Ok(format!(
            "ALTER TABLE {} {} {}",
            self.quote_identifier(&constraint.table),
            clause,
            self.quote_identifier(&constraint.name)
        ))
    }

    fn require_columns(&self, constraint: &Constraint) -> Result<()> {
        if constraint.columns.is_empty() {
            return Err(SyncError::validation(format!(
                "constraint `{}` has no columns",
                constraint.name
            )));
        }
        Ok(())
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::validation(format!("{what} is empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn generator() -> SqlGenerator {
        SqlGenerator::new()
    }

    fn test_table() -> Table {
        Table::new("test_table")
            .column(Column::new("id", "INT").not_null().auto_increment())
            .column(Column::new("email", "VARCHAR(255)").nullable())
            .index(Index::primary(["id"]))
    }

    fn fk_user_id() -> Constraint {
        Constraint::foreign_key("fk_user_id", ["user_id"], "users", ["id"])
            .on_update("CASCADE")
            .on_delete("RESTRICT")
            .on_table("orders")
    }

    #[test]
    fn test_create_table() {
        let sql = generator().create_table_sql(&test_table()).unwrap();

        assert!(sql.contains("CREATE TABLE `test_table`"));
        assert!(sql.contains("`id` INT NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("`email` VARCHAR(255) NULL"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert_eq!(
            sql,
            "CREATE TABLE `test_table` (`id` INT NOT NULL AUTO_INCREMENT, \
             `email` VARCHAR(255) NULL, PRIMARY KEY (`id`))"
        );
    }

    #[test]
    fn test_create_table_with_unique_keys() {
        let table = test_table().index(Index::unique("uk_email", ["email"]));
        let sql = generator().create_table_sql(&table).unwrap();
        assert!(sql.ends_with("PRIMARY KEY (`id`), UNIQUE KEY `uk_email` (`email`))"));
    }

    #[test]
    fn test_create_table_skips_plain_indexes() {
        let table = test_table().index(Index::new("idx_email", ["email"]));
        let sql = generator().create_table_sql(&table).unwrap();
        assert!(!sql.contains("idx_email"));
    }

    #[test]
    fn test_create_table_without_columns_fails() {
        let err = generator()
            .create_table_sql(&Table::new("empty"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_drop_table() {
        let sql = generator().drop_table_sql(&test_table()).unwrap();
        assert_eq!(sql, "DROP TABLE `test_table`");
    }

    #[test]
    fn test_empty_table_name_fails() {
        assert!(generator().drop_table_sql(&Table::new("")).is_err());
        assert!(generator()
            .add_column_sql("", &Column::new("a", "INT"))
            .is_err());
    }

    #[test]
    fn test_add_column() {
        let column = Column::new("new_column", "VARCHAR(100)").nullable();
        let sql = generator().add_column_sql("test_table", &column).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `test_table` ADD COLUMN `new_column` VARCHAR(100) NULL"
        );
    }

    #[test]
    fn test_column_definition_with_default() {
        let column = Column::new("status", "VARCHAR(20)").default_value("'active'");
        assert_eq!(
            generator().column_definition(&column).unwrap(),
            "`status` VARCHAR(20) NOT NULL DEFAULT 'active'"
        );

        let column = Column::new("created_at", "TIMESTAMP").default_value("CURRENT_TIMESTAMP");
        assert_eq!(
            generator().column_definition(&column).unwrap(),
            "`created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_column_definition_with_empty_default() {
        let column = Column::new("note", "VARCHAR(10)").nullable().default_value("''");
        assert_eq!(
            generator().column_definition(&column).unwrap(),
            "`note` VARCHAR(10) NULL DEFAULT ''"
        );
    }

    #[test]
    fn test_column_without_type_fails() {
        let err = generator()
            .column_definition(&Column::new("a", " "))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_drop_column() {
        let sql = generator()
            .drop_column_sql("users", &Column::new("email", "TEXT"))
            .unwrap();
        assert_eq!(sql, "ALTER TABLE `users` DROP COLUMN `email`");
    }

    #[test]
    fn test_modify_column_uses_new_definition() {
        let diff = ColumnDiff::new(
            Column::new("name", "VARCHAR(50)").nullable(),
            Column::new("name", "VARCHAR(255)").not_null(),
        );
        let sql = generator().modify_column_sql("users", &diff).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `users` MODIFY COLUMN `name` VARCHAR(255) NOT NULL"
        );
    }

    #[test]
    fn test_create_index() {
        let index = Index::new("idx_name_email", ["name", "email"]).on_table("users");
        assert_eq!(
            generator().create_index_sql(&index).unwrap(),
            "CREATE INDEX `idx_name_email` ON `users` (`name`, `email`)"
        );

        let index = Index::unique("uk_email", ["email"]).on_table("users");
        assert_eq!(
            generator().create_index_sql(&index).unwrap(),
            "CREATE UNIQUE INDEX `uk_email` ON `users` (`email`)"
        );
    }

    #[test]
    fn test_primary_index() {
        let index = Index::primary(["id", "tenant_id"]).on_table("users");
        assert_eq!(
            generator().create_index_sql(&index).unwrap(),
            "ALTER TABLE `users` ADD PRIMARY KEY (`id`, `tenant_id`)"
        );
        assert_eq!(
            generator().drop_index_sql(&index).unwrap(),
            "ALTER TABLE `users` DROP PRIMARY KEY"
        );
    }

    #[test]
    fn test_drop_index() {
        let index = Index::new("idx_email", ["email"]).on_table("users");
        assert_eq!(
            generator().drop_index_sql(&index).unwrap(),
            "DROP INDEX `idx_email` ON `users`"
        );
    }

    #[test]
    fn test_index_without_columns_fails() {
        let index = Index::new("idx", Vec::<String>::new()).on_table("users");
        assert!(generator().create_index_sql(&index).is_err());
    }

    #[test]
    fn test_foreign_key_add_and_drop() {
        let fk = fk_user_id();
        assert_eq!(
            generator().add_constraint_sql(&fk).unwrap(),
            "ALTER TABLE `orders` ADD CONSTRAINT `fk_user_id` FOREIGN KEY (`user_id`) \
             REFERENCES `users` (`id`) ON UPDATE CASCADE ON DELETE RESTRICT"
        );
        assert_eq!(
            generator().drop_constraint_sql(&fk).unwrap(),
            "ALTER TABLE `orders` DROP FOREIGN KEY `fk_user_id`"
        );
    }

    #[test]
    fn test_foreign_key_without_actions() {
        let fk = Constraint::foreign_key("fk_a", ["a_id"], "a", ["id"]).on_table("b");
        assert_eq!(
            generator().add_constraint_sql(&fk).unwrap(),
            "ALTER TABLE `b` ADD CONSTRAINT `fk_a` FOREIGN KEY (`a_id`) REFERENCES `a` (`id`)"
        );
    }

    #[test]
    fn test_unique_constraint_add_and_drop() {
        let uk = Constraint::unique("uk_sku", ["sku"]).on_table("products");
        assert_eq!(
            generator().add_constraint_sql(&uk).unwrap(),
            "ALTER TABLE `products` ADD CONSTRAINT `uk_sku` UNIQUE (`sku`)"
        );
        assert_eq!(
            generator().drop_constraint_sql(&uk).unwrap(),
            "ALTER TABLE `products` DROP INDEX `uk_sku`"
        );
    }

    #[test]
    fn test_check_constraint_add_and_drop() {
        let check = Constraint::check("chk_price", "price >= 0").on_table("products");
        assert_eq!(
            generator().add_constraint_sql(&check).unwrap(),
            "ALTER TABLE `products` ADD CONSTRAINT `chk_price` CHECK (price >= 0)"
        );
        assert_eq!(
            generator().drop_constraint_sql(&check).unwrap(),
            "ALTER TABLE `products` DROP CHECK `chk_price`"
        );
    }

    #[test]
    fn test_constraint_without_table_fails() {
        let check = Constraint::check("chk_price", "price >= 0");
        assert!(generator().add_constraint_sql(&check).is_err());
        assert!(generator().drop_constraint_sql(&check).is_err());
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(generator().quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_generate_dispatches_by_change() {
        let table = test_table();
        let change = SchemaChange::DropTable(&table);
        assert_eq!(change.statement_type(), StatementType::DropTable);
        assert_eq!(change.table_name(), "test_table");
        assert_eq!(
            generator().generate(&change).unwrap(),
            "DROP TABLE `test_table`"
        );

        let fk = fk_user_id();
        let change = SchemaChange::AddConstraint(&fk);
        assert_eq!(change.statement_type(), StatementType::AddConstraint);
        assert_eq!(change.table_name(), "orders");
    }
}
