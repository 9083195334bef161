// schema/mod.rs - Declarative table definitions and the registry that holds them
//
// Each table owner builds one `TableDefinition` and registers it explicitly at
// startup. The migration engine reads the registry; nothing here touches the
// database.

pub mod tables;

use serde::Serialize;
use thiserror::Error;

pub use tables::default_registry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table '{0}' is already registered")]
    DuplicateTable(String),

    #[error("Table '{table}' declares column '{column}' more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Table '{table}' references unregistered table '{referenced}'")]
    UnknownReference { table: String, referenced: String },

    #[error(
        "Table '{table}' (priority {priority}) references '{referenced}' with higher priority {referenced_priority}"
    )]
    PriorityInversion {
        table: String,
        priority: i32,
        referenced: String,
        referenced_priority: i32,
    },
}

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: &'static str,
    pub ref_table: &'static str,
    pub ref_column: &'static str,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// A table as declared by its owner.
///
/// `id` is implicit: every table gets an auto-incrementing primary key and
/// declares only its own columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub table_name: &'static str,
    pub creation_priority: i32,
    pub columns: Vec<(&'static str, &'static str)>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDefinition {
    pub fn new(table_name: &'static str, creation_priority: i32) -> Self {
        Self {
            table_name,
            creation_priority,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Append a column; declaration order is kept in the generated DDL.
    pub fn column(mut self, name: &'static str, type_ddl: &'static str) -> Self {
        self.columns.push((name, type_ddl));
        self
    }

    pub fn foreign_key(
        mut self,
        column: &'static str,
        ref_table: &'static str,
        ref_column: &'static str,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column,
            ref_table,
            ref_column,
            on_delete,
            on_update,
        });
        self
    }

    fn check_identifiers(&self) -> Result<(), SchemaError> {
        let names = std::iter::once(self.table_name)
            .chain(self.columns.iter().map(|(name, _)| *name))
            .chain(
                self.foreign_keys
                    .iter()
                    .flat_map(|fk| [fk.column, fk.ref_table, fk.ref_column]),
            );

        for name in names {
            if !is_valid_identifier(name) {
                return Err(SchemaError::InvalidIdentifier(name.to_string()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for (name, _) in &self.columns {
            if *name == "id" || !seen.insert(*name) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.table_name.to_string(),
                    column: name.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Identifiers are interpolated into DDL unquoted, so only plain
/// `[A-Za-z_][A-Za-z0-9_]*` names are accepted.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Explicitly composed set of table definitions.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: Vec<TableDefinition>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one definition. Fails fast on a duplicate table name.
    pub fn register(mut self, definition: TableDefinition) -> Result<Self, SchemaError> {
        definition.check_identifiers()?;

        if self.get(definition.table_name).is_some() {
            return Err(SchemaError::DuplicateTable(definition.table_name.to_string()));
        }

        tracing::debug!(
            "Registered table '{}' (priority {})",
            definition.table_name,
            definition.creation_priority
        );
        self.definitions.push(definition);
        Ok(self)
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> &[TableDefinition] {
        &self.definitions
    }

    pub fn get(&self, table_name: &str) -> Option<&TableDefinition> {
        self.definitions.iter().find(|d| d.table_name == table_name)
    }

    /// Check that every foreign key of `definition` points at a registered
    /// table that is created no later than `definition` itself.
    ///
    /// Self-references are allowed; the referenced table is the one being
    /// created.
    pub fn reference_violation(&self, definition: &TableDefinition) -> Option<SchemaError> {
        definition.foreign_keys.iter().find_map(|fk| {
            if fk.ref_table == definition.table_name {
                return None;
            }
            match self.get(fk.ref_table) {
                None => Some(SchemaError::UnknownReference {
                    table: definition.table_name.to_string(),
                    referenced: fk.ref_table.to_string(),
                }),
                Some(parent) if parent.creation_priority > definition.creation_priority => {
                    Some(SchemaError::PriorityInversion {
                        table: definition.table_name.to_string(),
                        priority: definition.creation_priority,
                        referenced: parent.table_name.to_string(),
                        referenced_priority: parent.creation_priority,
                    })
                }
                Some(_) => None,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
