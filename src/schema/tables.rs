use super::{ReferentialAction, SchemaError, SchemaRegistry, TableDefinition};

pub const USERS_TABLE: &str = "users";
pub const TASKS_TABLE: &str = "tasks";

pub fn users() -> TableDefinition {
    TableDefinition::new(USERS_TABLE, 1)
        .column("email", "VARCHAR(255) NOT NULL UNIQUE")
        .column("firstname", "VARCHAR(255) NOT NULL")
        .column("lastname", "VARCHAR(255) NOT NULL")
        .column("password", "VARCHAR(255) NOT NULL")
        .column("created_at", "TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP")
}

pub fn tasks() -> TableDefinition {
    TableDefinition::new(TASKS_TABLE, 10)
        .column("title", "VARCHAR(255) NOT NULL")
        .column("description", "TEXT NOT NULL DEFAULT ''")
        .column("is_completed", "BOOLEAN NOT NULL DEFAULT FALSE")
        .column("user_id", "INTEGER NOT NULL")
        .column("created_at", "TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP")
        .column("due_date", "TIMESTAMPTZ NULL")
        .column("completed_at", "TIMESTAMPTZ NULL")
        .foreign_key(
            "user_id",
            USERS_TABLE,
            "id",
            ReferentialAction::Cascade,
            ReferentialAction::Cascade,
        )
}

/// Registry with every table this service owns.
pub fn default_registry() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::new().register(users())?.register(tasks())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_is_consistent() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 2);
        for definition in registry.definitions() {
            assert_eq!(registry.reference_violation(definition), None);
        }
    }

    #[test]
    fn tasks_reference_users() {
        let tasks = tasks();
        assert_eq!(tasks.foreign_keys.len(), 1);
        assert_eq!(tasks.foreign_keys[0].ref_table, USERS_TABLE);
        assert!(tasks.creation_priority > users().creation_priority);
    }
}
