//! Parameterized INSERT template rendering
//!
//! The template carries one placeholder per column; row values are bound per
//! chunk at execution time. Keeping values out of the statement text prevents
//! injection and lets the connector batch execution.

use super::render_column_name;

/// DML generator
#[derive(Debug)]
pub struct DmlGenerator;

impl DmlGenerator {
    /// Render a multi-row insert template for the given table reference.
    ///
    /// `table` is either a qualified `schema.table` or a bare temporary-table
    /// name; the caller decides which.
    pub fn insert_template(table: &str, columns: &[String]) -> String {
        let column_list: Vec<String> = columns
            .iter()
            .map(|name| render_column_name(name))
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            column_list.join(", "),
            placeholders.join(", ")
        )
    }
}
