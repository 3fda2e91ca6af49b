//! Schema representation types.
//!
//! These types describe a database snapshot as produced by an extractor: tables,
//! their columns, indexes and named constraints. Types are plain serializable
//! data; the builders exist for tests and hand-written snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name MySQL gives to every primary key index.
pub const PRIMARY_INDEX_NAME: &str = "PRIMARY";

/// A full database schema snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Database name.
    pub name: String,
    /// Tables keyed by (case-sensitive) name.
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Adds a table, replacing any table of the same name.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// A table with its columns, indexes, and constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns keyed by name.
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    /// Indexes, including the primary key index.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Named constraints.
    #[serde(default)]
    pub constraints: BTreeMap<String, Constraint>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a column. A column without an explicit position is placed after
    /// the existing ones.
    #[must_use]
    pub fn column(mut self, mut column: Column) -> Self {
        if column.position == 0 {
            column.position = self.columns.len() + 1;
        }
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Adds an index, taking ownership of its table name.
    #[must_use]
    pub fn index(mut self, mut index: Index) -> Self {
        index.table.clone_from(&self.name);
        self.indexes.push(index);
        self
    }

    /// Adds a constraint, taking ownership of its table name.
    #[must_use]
    pub fn constraint(mut self, mut constraint: Constraint) -> Self {
        constraint.table.clone_from(&self.name);
        self.constraints.insert(constraint.name.clone(), constraint);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Gets an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns the primary key index, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.primary)
    }

    /// Returns columns in ordinal order (name breaks ties).
    #[must_use]
    pub fn ordered_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.values().collect();
        columns.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        columns
    }
}

/// A column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Dialect-native type, e.g. `VARCHAR(255)`.
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value as rendered SQL. `None` means no default, which is
    /// different from `Some("")`.
    #[serde(default)]
    pub default: Option<String>,
    /// Extra modifiers such as `AUTO_INCREMENT`.
    #[serde(default)]
    pub extra: String,
    /// 1-based ordinal position.
    #[serde(default)]
    pub position: usize,
}

impl Column {
    /// Creates a NOT NULL column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    /// Allows NULL values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Disallows NULL values.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value. String literals must already be quoted.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the extra modifiers.
    #[must_use]
    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Shorthand for `extra("AUTO_INCREMENT")`.
    #[must_use]
    pub fn auto_increment(self) -> Self {
        self.extra("AUTO_INCREMENT")
    }

    /// Sets the ordinal position.
    #[must_use]
    pub fn position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Whether any property that affects the column definition differs.
    /// Ordinal position is ignored.
    #[must_use]
    pub fn definition_differs(&self, other: &Self) -> bool {
        self.data_type != other.data_type
            || self.nullable != other.nullable
            || self.default != other.default
            || self.extra != other.extra
    }
}

/// An index on a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Owning table.
    #[serde(default)]
    pub table: String,
    /// Indexed columns; order defines the composite key.
    pub columns: Vec<String>,
    /// Whether values must be unique.
    #[serde(default)]
    pub unique: bool,
    /// Whether this is the primary key.
    #[serde(default)]
    pub primary: bool,
}

impl Index {
    /// Creates a plain index.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            table: String::new(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            primary: false,
        }
    }

    /// Creates a unique index.
    #[must_use]
    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }

    /// Creates the primary key index.
    #[must_use]
    pub fn primary<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            primary: true,
            ..Self::new(PRIMARY_INDEX_NAME, columns)
        }
    }

    /// Sets the owning table.
    #[must_use]
    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

/// Kind-specific part of a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// UNIQUE over the constraint columns.
    Unique,
    /// FOREIGN KEY referencing another table.
    ForeignKey {
        /// Referenced table.
        referenced_table: String,
        /// Referenced columns, positionally matched with the constraint columns.
        referenced_columns: Vec<String>,
        /// ON UPDATE action, e.g. `CASCADE`.
        #[serde(default)]
        on_update: Option<String>,
        /// ON DELETE action, e.g. `RESTRICT`.
        #[serde(default)]
        on_delete: Option<String>,
    },
    /// CHECK with a raw expression.
    Check {
        /// The check expression.
        expression: String,
    },
}

impl ConstraintKind {
    /// Returns the kind tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "UNIQUE",
            Self::ForeignKey { .. } => "FOREIGN KEY",
            Self::Check { .. } => "CHECK",
        }
    }
}

/// A named table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint name.
    pub name: String,
    /// Owning table.
    #[serde(default)]
    pub table: String,
    /// Constrained columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Kind and kind-specific fields.
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl Constraint {
    /// Creates a UNIQUE constraint.
    #[must_use]
    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            table: String::new(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind: ConstraintKind::Unique,
        }
    }

    /// Creates a FOREIGN KEY constraint without referential actions.
    #[must_use]
    pub fn foreign_key<I, S, R, T>(
        name: impl Into<String>,
        columns: I,
        referenced_table: impl Into<String>,
        referenced_columns: R,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            table: String::new(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind: ConstraintKind::ForeignKey {
                referenced_table: referenced_table.into(),
                referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
                on_update: None,
                on_delete: None,
            },
        }
    }

    /// Creates a CHECK constraint.
    #[must_use]
    pub fn check(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            columns: Vec::new(),
            kind: ConstraintKind::Check {
                expression: expression.into(),
            },
        }
    }

    /// Sets the ON UPDATE action. No effect on non foreign keys.
    #[must_use]
    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        if let ConstraintKind::ForeignKey { on_update, .. } = &mut self.kind {
            *on_update = Some(action.into());
        }
        self
    }

    /// Sets the ON DELETE action. No effect on non foreign keys.
    #[must_use]
    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        if let ConstraintKind::ForeignKey { on_delete, .. } = &mut self.kind {
            *on_delete = Some(action.into());
        }
        self
    }

    /// Sets the owning table.
    #[must_use]
    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Returns the referenced table of a foreign key.
    #[must_use]
    pub fn referenced_table(&self) -> Option<&str> {
        match &self.kind {
            ConstraintKind::ForeignKey {
                referenced_table, ..
            } => Some(referenced_table),
            _ => None,
        }
    }
}
