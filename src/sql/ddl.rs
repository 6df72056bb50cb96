//! CREATE TABLE rendering
//!
//! Renders a complete CREATE TABLE statement from sanitized names, inferred
//! or overridden types, resolved keys and compression hints. Column order in
//! the output always equals the input column order.

use super::render_column_name;
use crate::dataset::TableTarget;
use crate::keys::{DistSpec, DistStyle};
use std::collections::BTreeMap;

/// Type used when a column somehow has no entry in the type map
const FALLBACK_TYPE: &str = "VARCHAR(256)";

/// DDL generator for one resolved load call
#[derive(Debug)]
pub struct DdlGenerator<'a> {
    /// Sanitized destination
    pub target: &'a TableTarget,
    /// Ordered column names; output order is exactly this order
    pub columns: &'a [String],
    /// Column name -> warehouse type
    pub types: &'a BTreeMap<String, String>,
    /// Primary key columns (empty for no key)
    pub primary_key: &'a [String],
    /// Physical sort precedence (empty for none)
    pub sortkey: &'a [String],
    /// Distribution specification, if any
    pub dist: Option<&'a DistSpec>,
    /// Column name -> compression encoding, appended only when supplied
    pub compression: &'a BTreeMap<String, String>,
    /// Render a TEMPORARY table (unqualified name; session-scoped)
    pub temporary: bool,
    /// Render CREATE TABLE IF NOT EXISTS (append-mode auto-create)
    pub if_not_exists: bool,
}

impl DdlGenerator<'_> {
    /// Render the CREATE TABLE statement
    pub fn sql(&self) -> String {
        let mut statement = String::from("CREATE ");
        if self.temporary {
            statement.push_str("TEMPORARY ");
        }
        statement.push_str("TABLE ");
        if self.if_not_exists {
            statement.push_str("IF NOT EXISTS ");
        }
        // Temporary tables are session-scoped and cannot be schema-qualified.
        if self.temporary {
            statement.push_str(&self.target.table);
        } else {
            statement.push_str(&self.target.qualified());
        }
        statement.push_str(" (\n");

        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|name| {
                let column_type = self
                    .types
                    .get(name)
                    .map(String::as_str)
                    .unwrap_or(FALLBACK_TYPE);
                let mut line = format!("  {} {}", render_column_name(name), column_type);
                if let Some(encoding) = self.compression.get(name) {
                    line.push_str(&format!(" ENCODE {encoding}"));
                }
                line
            })
            .collect();

        if !self.primary_key.is_empty() {
            let key_columns: Vec<String> = self
                .primary_key
                .iter()
                .map(|name| render_column_name(name))
                .collect();
            lines.push(format!("  PRIMARY KEY ({})", key_columns.join(", ")));
        }

        statement.push_str(&lines.join(",\n"));
        statement.push_str("\n)");

        if !self.sortkey.is_empty() {
            let sort_columns: Vec<String> = self
                .sortkey
                .iter()
                .map(|name| render_column_name(name))
                .collect();
            statement.push_str(&format!("\nSORTKEY ({})", sort_columns.join(", ")));
        }

        if let Some(dist) = self.dist {
            statement.push_str(&format!("\nDISTSTYLE {}", dist.style.sql_keyword()));
            if dist.style == DistStyle::Key {
                if let Some(key_column) = &dist.key_column {
                    statement.push_str(&format!(
                        "\nDISTKEY ({})",
                        render_column_name(key_column)
                    ));
                }
            }
        }

        statement
    }
}
