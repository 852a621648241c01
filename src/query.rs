//! SQL text generation.
//!
//! Only schema-declared identifiers are ever interpolated; values always go
//! through `?` placeholders.

use crate::schema::Model;

/// Bookkeeping table for per-table schema versions.
pub const MIGRATION_TABLE: &str = "model_migration";

pub const CREATE_MIGRATION_TABLE: &str = "CREATE TABLE IF NOT EXISTS model_migration (\
id INTEGER PRIMARY KEY AUTOINCREMENT, \
table_name TEXT UNIQUE NOT NULL, \
last_updated TIMESTAMP NOT NULL, \
schema BLOB NOT NULL)";

/// Implicit row identity of every table.
pub const ROWID: &str = "rowid";

pub fn create_table(model: &Model) -> String {
    let columns: Vec<String> = model
        .fields()
        .iter()
        .map(|field| field.column_definition())
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        model.table_name(),
        columns.join(", ")
    )
}

/// SELECT over every declared column, in declaration order.
///
/// No filters means no WHERE clause.
pub fn select(model: &Model, filters: &[&str]) -> String {
    let columns: Vec<&str> = model.fields().iter().map(|f| f.name.as_str()).collect();
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), model.table_name());
    if !filters.is_empty() {
        let conditions: Vec<String> = filters.iter().map(|f| format!("{}=?", f)).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql
}

pub fn select_column(table: &str, field: &str, primary: &str) -> String {
    format!("SELECT {} FROM {} WHERE {}=?", field, table, primary)
}

pub fn insert(table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", table);
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    )
}

pub fn update(table: &str, field: &str, primary: &str) -> String {
    format!("UPDATE {} SET {}=? WHERE {}=?", table, field, primary)
}

pub fn delete(table: &str, primary: &str) -> String {
    format!("DELETE FROM {} WHERE {}=?", table, primary)
}
