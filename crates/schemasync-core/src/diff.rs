//! Schema diff engine.
//!
//! Compares a source [`Schema`] (the desired state) against a target
//! [`Schema`] (the database to be changed) and describes what must change on
//! the target. Tables, columns, indexes and constraints are matched by name.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::schema::{Column, Constraint, ConstraintKind, Index, Schema, Table};

/// A column present on both sides whose definition changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDiff {
    /// Column name.
    pub name: String,
    /// Definition on the target.
    pub old: Column,
    /// Definition in the source; authoritative for generated SQL.
    pub new: Column,
}

impl ColumnDiff {
    /// Creates a column diff named after the new column.
    #[must_use]
    pub fn new(old: Column, new: Column) -> Self {
        Self {
            name: new.name.clone(),
            old,
            new,
        }
    }

    /// Whether the data type changed.
    #[must_use]
    pub fn type_changed(&self) -> bool {
        self.old.data_type != self.new.data_type
    }

    /// Whether a nullable column becomes NOT NULL.
    #[must_use]
    pub fn becomes_not_null(&self) -> bool {
        self.old.nullable && !self.new.nullable
    }

    fn reversed(&self) -> Self {
        Self {
            name: self.name.clone(),
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }
}

/// Column and constraint changes for a table present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff {
    /// Table name.
    pub name: String,
    /// Columns to add.
    #[serde(default)]
    pub added_columns: Vec<Column>,
    /// Columns to drop.
    #[serde(default)]
    pub removed_columns: Vec<Column>,
    /// Columns to redefine.
    #[serde(default)]
    pub modified_columns: Vec<ColumnDiff>,
    /// Constraints to add.
    #[serde(default)]
    pub added_constraints: Vec<Constraint>,
    /// Constraints to drop.
    #[serde(default)]
    pub removed_constraints: Vec<Constraint>,
}

impl TableDiff {
    /// Creates an empty diff for a table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the table has no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.added_constraints.is_empty()
            && self.removed_constraints.is_empty()
    }

    fn reversed(&self) -> Self {
        Self {
            name: self.name.clone(),
            added_columns: self.removed_columns.clone(),
            removed_columns: self.added_columns.clone(),
            modified_columns: self.modified_columns.iter().map(ColumnDiff::reversed).collect(),
            added_constraints: self.removed_constraints.clone(),
            removed_constraints: self.added_constraints.clone(),
        }
    }
}

/// Per-category change counts of a [`SchemaDiff`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    /// Tables to create.
    pub tables_added: usize,
    /// Tables to drop.
    pub tables_removed: usize,
    /// Tables with column or constraint changes.
    pub tables_modified: usize,
    /// Columns to add.
    pub columns_added: usize,
    /// Columns to drop.
    pub columns_removed: usize,
    /// Columns to redefine.
    pub columns_modified: usize,
    /// Indexes to create.
    pub indexes_added: usize,
    /// Indexes to drop.
    pub indexes_removed: usize,
    /// Constraints to add, table-scoped or not.
    pub constraints_added: usize,
    /// Constraints to drop, table-scoped or not.
    pub constraints_removed: usize,
}

impl DiffCounts {
    /// Whether no category in `self` exceeds the same category in `other`.
    #[must_use]
    pub fn no_larger_than(&self, other: &Self) -> bool {
        self.tables_added <= other.tables_added
            && self.tables_removed <= other.tables_removed
            && self.tables_modified <= other.tables_modified
            && self.columns_added <= other.columns_added
            && self.columns_removed <= other.columns_removed
            && self.columns_modified <= other.columns_modified
            && self.indexes_added <= other.indexes_added
            && self.indexes_removed <= other.indexes_removed
            && self.constraints_added <= other.constraints_added
            && self.constraints_removed <= other.constraints_removed
    }
}

/// Everything that must change on the target to match the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Tables only in the source; created on the target.
    #[serde(default)]
    pub added_tables: Vec<Table>,
    /// Tables only in the target; dropped.
    #[serde(default)]
    pub removed_tables: Vec<Table>,
    /// Tables on both sides with column or constraint changes.
    #[serde(default)]
    pub modified_tables: Vec<TableDiff>,
    /// Indexes to create, including secondary indexes of added tables.
    #[serde(default)]
    pub added_indexes: Vec<Index>,
    /// Indexes to drop.
    #[serde(default)]
    pub removed_indexes: Vec<Index>,
    /// Constraints of added tables that are not part of CREATE TABLE.
    #[serde(default)]
    pub added_constraints: Vec<Constraint>,
    /// Foreign keys of removed tables, dropped before any table is.
    #[serde(default)]
    pub removed_constraints: Vec<Constraint>,
}

impl SchemaDiff {
    /// Returns `true` if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.iter().all(TableDiff::is_empty)
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.added_constraints.is_empty()
            && self.removed_constraints.is_empty()
    }

    /// Counts changes per category.
    #[must_use]
    pub fn summary_counts(&self) -> DiffCounts {
        let modified = self.modified_tables.iter().filter(|t| !t.is_empty());
        let mut counts = DiffCounts {
            tables_added: self.added_tables.len(),
            tables_removed: self.removed_tables.len(),
            indexes_added: self.added_indexes.len(),
            indexes_removed: self.removed_indexes.len(),
            constraints_added: self.added_constraints.len(),
            constraints_removed: self.removed_constraints.len(),
            ..DiffCounts::default()
        };
        for table in modified {
            counts.tables_modified += 1;
            counts.columns_added += table.added_columns.len();
            counts.columns_removed += table.removed_columns.len();
            counts.columns_modified += table.modified_columns.len();
            counts.constraints_added += table.added_constraints.len();
            counts.constraints_removed += table.removed_constraints.len();
        }
        counts
    }

    /// Returns the diff that undoes this one.
    ///
    /// Added and removed entities swap sides and every column diff swaps its
    /// old and new definitions. Tables are handled the way
    /// [`compare_schemas`] handles them: a re-created table gets its
    /// secondary indexes and constraints back, and a dropped table loses
    /// only its foreign keys ahead of the DROP TABLE.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let added: BTreeSet<&str> = self.added_tables.iter().map(|t| t.name.as_str()).collect();
        let removed: BTreeSet<&str> = self.removed_tables.iter().map(|t| t.name.as_str()).collect();

        let mut reversed = Self {
            added_tables: self.removed_tables.clone(),
            removed_tables: self.added_tables.clone(),
            modified_tables: self.modified_tables.iter().map(TableDiff::reversed).collect(),
            ..Self::default()
        };

        for table in &self.removed_tables {
            reversed.added_indexes.extend(creation_companion_indexes(table));
            reversed.added_constraints.extend(creation_companion_constraints(table));
        }
        for table in &self.added_tables {
            reversed.removed_constraints.extend(dropped_table_foreign_keys(table));
        }

        reversed.added_indexes.extend(
            self.removed_indexes
                .iter()
                .filter(|i| !removed.contains(i.table.as_str()))
                .cloned(),
        );
        reversed.removed_indexes.extend(
            self.added_indexes
                .iter()
                .filter(|i| !added.contains(i.table.as_str()))
                .cloned(),
        );
        reversed.added_constraints.extend(
            self.removed_constraints
                .iter()
                .filter(|c| !removed.contains(c.table.as_str()))
                .cloned(),
        );
        reversed.removed_constraints.extend(
            self.added_constraints
                .iter()
                .filter(|c| !added.contains(c.table.as_str()))
                .cloned(),
        );
        reversed
    }
}

/// Compares `source` against `target`.
///
/// A table only in `source` is added, a table only in `target` is removed
/// after its foreign keys are dropped, so no DROP TABLE runs while another
/// dropped table still references it.
/// Tables on both sides are compared column by column; a changed column
/// becomes a [`ColumnDiff`]. A changed index or constraint is reported as
/// removed and added again.
pub fn compare_schemas(source: &Schema, target: &Schema) -> Result<SchemaDiff> {
    check_table_keys(source)?;
    check_table_keys(target)?;

    let source_names: BTreeSet<&str> = source.tables.keys().map(String::as_str).collect();
    let target_names: BTreeSet<&str> = target.tables.keys().map(String::as_str).collect();

    let mut diff = SchemaDiff::default();

    // ---- New tables -> create, with companions ------------------
    for &name in source_names.difference(&target_names) {
        let table = &source.tables[name];
        diff.added_tables.push(table.clone());
        diff.added_indexes.extend(creation_companion_indexes(table));
        diff.added_constraints.extend(creation_companion_constraints(table));
    }

    // ---- Missing tables -> drop, foreign keys first --------------
    for &name in target_names.difference(&source_names) {
        let table = &target.tables[name];
        diff.removed_tables.push(table.clone());
        diff.removed_constraints.extend(dropped_table_foreign_keys(table));
    }

    // ---- Common tables ------------------------------------------
    for &name in source_names.intersection(&target_names) {
        let desired = &source.tables[name];
        let current = &target.tables[name];

        let table_diff = diff_table(desired, current);
        if !table_diff.is_empty() {
            diff.modified_tables.push(table_diff);
        }
        diff_indexes(desired, current, &mut diff);
    }

    Ok(diff)
}

fn check_table_keys(schema: &Schema) -> Result<()> {
    for (key, table) in &schema.tables {
        if key.is_empty() || *key != table.name {
            return Err(SyncError::schema(format!(
                "schema `{}` lists table `{}` under key `{}`",
                schema.name, table.name, key
            ))
            .with_context("schema", &schema.name));
        }
    }
    Ok(())
}

/// Compares columns and constraints of one table.
fn diff_table(desired: &Table, current: &Table) -> TableDiff {
    let mut table_diff = TableDiff::new(desired.name.clone());

    for column in desired.ordered_columns() {
        match current.get_column(&column.name) {
            None => table_diff.added_columns.push(column.clone()),
            Some(existing) if existing.definition_differs(column) => table_diff
                .modified_columns
                .push(ColumnDiff::new(existing.clone(), column.clone())),
            Some(_) => {}
        }
    }
    for column in current.ordered_columns() {
        if desired.get_column(&column.name).is_none() {
            table_diff.removed_columns.push(column.clone());
        }
    }

    let desired_constraints = constraints_by_name(desired);
    let current_constraints = constraints_by_name(current);

    for (name, constraint) in &desired_constraints {
        match current_constraints.get(name) {
            None => table_diff
                .added_constraints
                .push(owned_constraint(constraint, &desired.name)),
            Some(existing) if !constraints_equivalent(existing, constraint) => {
                table_diff
                    .removed_constraints
                    .push(owned_constraint(existing, &current.name));
                table_diff
                    .added_constraints
                    .push(owned_constraint(constraint, &desired.name));
            }
            Some(_) => {}
        }
    }
    for (name, constraint) in &current_constraints {
        if !desired_constraints.contains_key(name) {
            table_diff
                .removed_constraints
                .push(owned_constraint(constraint, &current.name));
        }
    }

    table_diff
}

/// Compares indexes of one table, recording changes at schema level.
fn diff_indexes(desired: &Table, current: &Table, diff: &mut SchemaDiff) {
    for index in &desired.indexes {
        match current.get_index(&index.name) {
            None => diff.added_indexes.push(owned_index(index, &desired.name)),
            Some(existing) if !indexes_equivalent(existing, index) => {
                diff.removed_indexes.push(owned_index(existing, &current.name));
                diff.added_indexes.push(owned_index(index, &desired.name));
            }
            Some(_) => {}
        }
    }
    for index in &current.indexes {
        if desired.get_index(&index.name).is_none() {
            diff.removed_indexes.push(owned_index(index, &current.name));
        }
    }
}

fn indexes_equivalent(a: &Index, b: &Index) -> bool {
    a.columns == b.columns && a.unique == b.unique && a.primary == b.primary
}

fn constraints_equivalent(a: &Constraint, b: &Constraint) -> bool {
    a.columns == b.columns && a.kind == b.kind
}

/// Named constraints that are diffed as constraints. A unique constraint that
/// shares its name with a unique index is the same object in MySQL and is
/// handled by the index diff.
fn constraints_by_name(table: &Table) -> BTreeMap<&str, &Constraint> {
    table
        .constraints
        .values()
        .filter(|c| !shadowed_by_index(table, c))
        .map(|c| (c.name.as_str(), c))
        .collect()
}

fn shadowed_by_index(table: &Table, constraint: &Constraint) -> bool {
    matches!(constraint.kind, ConstraintKind::Unique)
        && table
            .get_index(&constraint.name)
            .is_some_and(|i| i.unique)
}

/// Indexes of a new table that CREATE TABLE does not render.
fn creation_companion_indexes(table: &Table) -> Vec<Index> {
    table
        .indexes
        .iter()
        .filter(|i| !i.primary && !i.unique)
        .map(|i| owned_index(i, &table.name))
        .collect()
}

/// Constraints of a new table that CREATE TABLE does not render.
fn creation_companion_constraints(table: &Table) -> Vec<Constraint> {
    constraints_by_name(table)
        .into_values()
        .map(|c| owned_constraint(c, &table.name))
        .collect()
}

/// Foreign keys of a removed table.
fn dropped_table_foreign_keys(table: &Table) -> Vec<Constraint> {
    constraints_by_name(table)
        .into_values()
        .filter(|c| matches!(c.kind, ConstraintKind::ForeignKey { .. }))
        .map(|c| owned_constraint(c, &table.name))
        .collect()
}

fn owned_index(index: &Index, table: &str) -> Index {
    let mut index = index.clone();
    if index.table.is_empty() {
        index.table = table.to_string();
    }
    index
}

fn owned_constraint(constraint: &Constraint, table: &str) -> Constraint {
    let mut constraint = constraint.clone();
    if constraint.table.is_empty() {
        constraint.table = table.to_string();
    }
    constraint
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_v1() -> Table {
        Table::new("users")
            .column(Column::new("id", "INT").auto_increment())
            .column(Column::new("name", "VARCHAR(50)").nullable())
            .column(Column::new("legacy", "TEXT").nullable())
            .index(Index::primary(["id"]))
            .index(Index::new("idx_name", ["name"]))
    }

    fn users_v2() -> Table {
        Table::new("users")
            .column(Column::new("id", "INT").auto_increment())
            .column(Column::new("name", "VARCHAR(255)"))
            .column(Column::new("email", "VARCHAR(255)").nullable())
            .index(Index::primary(["id"]))
            .index(Index::new("idx_name", ["name", "email"]))
    }

    fn orders() -> Table {
        Table::new("orders")
            .column(Column::new("id", "INT").auto_increment())
            .column(Column::new("user_id", "INT"))
            .index(Index::primary(["id"]))
            .index(Index::new("idx_user_id", ["user_id"]))
            .constraint(
                Constraint::foreign_key("fk_user_id", ["user_id"], "users", ["id"])
                    .on_delete("CASCADE"),
            )
    }

    #[test]
    fn test_identical_schemas_produce_empty_diff() {
        let schema = Schema::new("app").table(users_v1()).table(orders());
        let diff = compare_schemas(&schema, &schema).unwrap();
        assert!(diff.is_empty());
        assert_eq!(diff.summary_counts(), DiffCounts::default());
    }

    #[test]
    fn test_added_table_with_companions() {
        let source = Schema::new("app").table(users_v1()).table(orders());
        let target = Schema::new("app").table(users_v1());

        let diff = compare_schemas(&source, &target).unwrap();
        assert_eq!(diff.added_tables.len(), 1);
        assert_eq!(diff.added_tables[0].name, "orders");
        assert_eq!(diff.added_indexes.len(), 1);
        assert_eq!(diff.added_indexes[0].name, "idx_user_id");
        assert_eq!(diff.added_indexes[0].table, "orders");
        assert_eq!(diff.added_constraints.len(), 1);
        assert_eq!(diff.added_constraints[0].name, "fk_user_id");
        assert_eq!(diff.added_constraints[0].table, "orders");
        assert!(diff.modified_tables.is_empty());
    }

    #[test]
    fn test_removed_table() {
        let source = Schema::new("app").table(users_v1());
        let target = Schema::new("app").table(users_v1()).table(orders());

        let diff = compare_schemas(&source, &target).unwrap();
        assert_eq!(diff.removed_tables.len(), 1);
        assert_eq!(diff.removed_tables[0].name, "orders");
        assert!(diff.added_tables.is_empty());
        assert_eq!(diff.removed_constraints.len(), 1);
        assert_eq!(diff.removed_constraints[0].name, "fk_user_id");
        assert_eq!(diff.removed_constraints[0].table, "orders");
        assert!(diff.removed_indexes.is_empty());
    }

    #[test]
    fn test_removed_tables_drop_only_foreign_keys() {
        let accounts = Table::new("accounts")
            .column(Column::new("id", "INT"))
            .index(Index::primary(["id"]))
            .constraint(Constraint::check("chk_id", "id > 0"));
        let orders = Table::new("orders")
            .column(Column::new("id", "INT"))
            .column(Column::new("account_id", "INT"))
            .index(Index::new("idx_account_id", ["account_id"]))
            .constraint(Constraint::foreign_key(
                "fk_account",
                ["account_id"],
                "accounts",
                ["id"],
            ));
        let target = Schema::new("app").table(accounts).table(orders);

        let diff = compare_schemas(&Schema::new("app"), &target).unwrap();
        assert_eq!(diff.removed_tables.len(), 2);
        assert_eq!(diff.removed_constraints.len(), 1);
        assert_eq!(diff.removed_constraints[0].name, "fk_account");
        assert!(diff.removed_indexes.is_empty());
    }

    #[test]
    fn test_added_and_removed_are_symmetric() {
        let a = Schema::new("a").table(users_v1()).table(orders());
        let b = Schema::new("b")
            .table(users_v1())
            .table(Table::new("audit").column(Column::new("id", "BIGINT")));

        let ab = compare_schemas(&a, &b).unwrap();
        let ba = compare_schemas(&b, &a).unwrap();
        assert_eq!(ab.added_tables, ba.removed_tables);
        assert_eq!(ab.removed_tables, ba.added_tables);
    }

    #[test]
    fn test_modified_column_is_a_column_diff() {
        let source = Schema::new("app").table(users_v2());
        let target = Schema::new("app").table(users_v1());

        let diff = compare_schemas(&source, &target).unwrap();
        assert_eq!(diff.modified_tables.len(), 1);

        let table = &diff.modified_tables[0];
        assert_eq!(table.name, "users");
        assert_eq!(table.added_columns.len(), 1);
        assert_eq!(table.added_columns[0].name, "email");
        assert_eq!(table.removed_columns.len(), 1);
        assert_eq!(table.removed_columns[0].name, "legacy");
        assert_eq!(table.modified_columns.len(), 1);

        let column = &table.modified_columns[0];
        assert_eq!(column.name, "name");
        assert_eq!(column.old.data_type, "VARCHAR(50)");
        assert_eq!(column.new.data_type, "VARCHAR(255)");
        assert!(column.type_changed());
        assert!(column.becomes_not_null());
    }

    #[test]
    fn test_default_and_extra_changes_are_detected() {
        let target = Schema::new("app").table(
            Table::new("t")
                .column(Column::new("a", "INT"))
                .column(Column::new("b", "INT")),
        );
        let source = Schema::new("app").table(
            Table::new("t")
                .column(Column::new("a", "INT").default_value("0"))
                .column(Column::new("b", "INT").auto_increment()),
        );

        let diff = compare_schemas(&source, &target).unwrap();
        assert_eq!(diff.modified_tables[0].modified_columns.len(), 2);
    }

    #[test]
    fn test_column_reorder_is_not_a_change() {
        let target = Schema::new("app").table(
            Table::new("t")
                .column(Column::new("a", "INT").position(1))
                .column(Column::new("b", "INT").position(2)),
        );
        let source = Schema::new("app").table(
            Table::new("t")
                .column(Column::new("a", "INT").position(2))
                .column(Column::new("b", "INT").position(1)),
        );
        assert!(compare_schemas(&source, &target).unwrap().is_empty());
    }

    #[test]
    fn test_changed_index_is_dropped_and_recreated() {
        let source = Schema::new("app").table(users_v2());
        let target = Schema::new("app").table(users_v1());

        let diff = compare_schemas(&source, &target).unwrap();
        assert_eq!(diff.removed_indexes.len(), 1);
        assert_eq!(diff.added_indexes.len(), 1);
        assert_eq!(diff.removed_indexes[0].columns, vec!["name"]);
        assert_eq!(diff.added_indexes[0].columns, vec!["name", "email"]);
        assert_eq!(diff.added_indexes[0].table, "users");
    }

    #[test]
    fn test_changed_constraint_is_dropped_and_readded() {
        let target = Schema::new("app").table(orders());
        let mut changed = orders();
        changed.constraints.insert(
            "fk_user_id".to_string(),
            Constraint::foreign_key("fk_user_id", ["user_id"], "users", ["id"])
                .on_delete("RESTRICT")
                .on_table("orders"),
        );
        let source = Schema::new("app").table(changed);

        let diff = compare_schemas(&source, &target).unwrap();
        let table = &diff.modified_tables[0];
        assert_eq!(table.removed_constraints.len(), 1);
        assert_eq!(table.added_constraints.len(), 1);
        assert!(table.added_columns.is_empty());
    }

    #[test]
    fn test_unique_constraint_shadowed_by_index() {
        let table = Table::new("products")
            .column(Column::new("sku", "VARCHAR(32)"))
            .index(Index::unique("uk_sku", ["sku"]))
            .constraint(Constraint::unique("uk_sku", ["sku"]));
        let source = Schema::new("app").table(table);
        let target = Schema::new("app");

        let diff = compare_schemas(&source, &target).unwrap();
        assert_eq!(diff.added_tables.len(), 1);
        assert!(diff.added_indexes.is_empty());
        assert!(diff.added_constraints.is_empty());
    }

    #[test]
    fn test_mismatched_table_key_is_a_schema_error() {
        let mut schema = Schema::new("app");
        schema.tables.insert("alias".to_string(), users_v1());

        let err = compare_schemas(&schema, &Schema::new("app")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
    }

    #[test]
    fn test_reversed_diff_swaps_sides() {
        let source = Schema::new("app").table(users_v2()).table(orders());
        let target = Schema::new("app").table(users_v1());

        let diff = compare_schemas(&source, &target).unwrap();
        let reversed = diff.reversed();
        assert_eq!(reversed.removed_tables, diff.added_tables);
        assert_eq!(reversed.added_indexes.len(), diff.removed_indexes.len());

        let column = &reversed.modified_tables[0].modified_columns[0];
        assert_eq!(column.new.data_type, "VARCHAR(50)");
        assert_eq!(reversed.modified_tables[0].added_columns[0].name, "legacy");
    }

    #[test]
    fn test_reversed_restores_companions_of_dropped_tables() {
        let source = Schema::new("app").table(users_v1());
        let target = Schema::new("app").table(users_v1()).table(orders());

        let reversed = compare_schemas(&source, &target).unwrap().reversed();
        assert_eq!(reversed.added_tables.len(), 1);
        assert_eq!(reversed.added_indexes.len(), 1);
        assert_eq!(reversed.added_constraints.len(), 1);
        assert_eq!(
            reversed,
            compare_schemas(&target, &source).unwrap(),
            "reversing should match comparing the other way round"
        );
    }

    #[test]
    fn test_reversed_matches_comparing_the_other_way_round() {
        let a = Schema::new("app").table(users_v2()).table(orders());
        let b = Schema::new("app").table(users_v1());

        let ab = compare_schemas(&a, &b).unwrap();
        let ba = compare_schemas(&b, &a).unwrap();
        assert_eq!(ab.reversed(), ba);
        assert_eq!(ba.reversed(), ab);
        assert_eq!(ab.reversed().reversed(), ab);
    }

    #[test]
    fn test_reversed_does_not_drop_companions_of_dropped_tables() {
        let source = Schema::new("app").table(users_v1()).table(orders());
        let target = Schema::new("app").table(users_v1());

        let reversed = compare_schemas(&source, &target).unwrap().reversed();
        assert_eq!(reversed.removed_tables.len(), 1);
        assert!(reversed.removed_indexes.is_empty());
        assert_eq!(reversed.removed_constraints.len(), 1);
        assert_eq!(reversed.removed_constraints[0].name, "fk_user_id");
    }

    #[test]
    fn test_summary_counts() {
        let source = Schema::new("app").table(users_v2()).table(orders());
        let target = Schema::new("app").table(users_v1());

        let counts = compare_schemas(&source, &target).unwrap().summary_counts();
        assert_eq!(counts.tables_added, 1);
        assert_eq!(counts.tables_modified, 1);
        assert_eq!(counts.columns_added, 1);
        assert_eq!(counts.columns_removed, 1);
        assert_eq!(counts.columns_modified, 1);
        assert_eq!(counts.indexes_added, 2);
        assert_eq!(counts.indexes_removed, 1);
        assert_eq!(counts.constraints_added, 1);
        assert!(DiffCounts::default().no_larger_than(&counts));
        assert!(!counts.no_larger_than(&DiffCounts::default()));
    }

    #[test]
    fn test_diff_serializes_with_stable_field_names() {
        let source = Schema::new("app").table(orders());
        let diff = compare_schemas(&source, &Schema::new("app")).unwrap();

        let json = serde_json::to_value(&diff).unwrap();
        assert!(json.get("added_tables").is_some());
        assert_eq!(json["added_constraints"][0]["kind"], "foreign_key");

        let back: SchemaDiff = serde_json::from_value(json).unwrap();
        assert_eq!(back, diff);
    }
}
