//! SQL statement generation
//!
//! Renders dialect DDL and DML text from sanitized identifiers, inferred
//! types and validated key specifications. Data values are never interpolated
//! into statement text; inserts are parameterized templates executed per
//! chunk.

pub mod ddl;
pub mod dml;

pub use ddl::DdlGenerator;
pub use dml::DmlGenerator;

use crate::reference::is_reserved_word;

/// Render a column name for statement text.
///
/// Reserved-word collisions are always double-quoted here regardless of
/// whether the sanitizer renamed them upstream, so a reserved name can never
/// reach the warehouse unescaped.
pub(crate) fn render_column_name(name: &str) -> String {
    if is_reserved_word(name) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}
