use crate::schema::TableDefinition;

/// Primary key clause every generated table starts with.
pub const PRIMARY_KEY_COLUMN: &str = "id SERIAL PRIMARY KEY";

/// Generate the idempotent `CREATE TABLE IF NOT EXISTS` statement for one
/// definition: primary key, declared columns in order, then foreign keys in
/// order.
pub fn create_table_statement(definition: &TableDefinition) -> String {
    let mut clauses = Vec::with_capacity(1 + definition.columns.len() + definition.foreign_keys.len());
    clauses.push(PRIMARY_KEY_COLUMN.to_string());

    for (name, type_ddl) in &definition.columns {
        clauses.push(format!("{} {}", name, type_ddl));
    }

    for fk in &definition.foreign_keys {
        clauses.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            fk.column,
            fk.ref_table,
            fk.ref_column,
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        definition.table_name,
        clauses.join(",\n    ")
    )
}
