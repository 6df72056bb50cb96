//! Identifier sanitization
//!
//! Table and schema names are cleaned through a deterministic, idempotent
//! pipeline; column names colliding with reserved words or system columns are
//! either renamed (recording old -> new in a rename map) or rejected with the
//! complete list of offenders.

use crate::dataset::{Column, Dataset};
use crate::error::{LoadError, LoadResult};
use crate::reference::{is_reserved_word, is_system_column};
use std::collections::BTreeMap;

/// Identifiers longer than this many UTF-8 bytes are truncated
const MAX_IDENTIFIER_BYTES: usize = 127;

/// Truncation target; `_trunc` is appended after cutting here
const TRUNCATED_BYTES: usize = 120;

/// Suffix appended to columns renamed away from reserved words
const RENAME_SUFFIX: &str = "_col";

/// Clean a table or schema identifier.
///
/// The pipeline, in order: spaces become underscores, every character outside
/// `[A-Za-z0-9_$]` becomes an underscore, a leading non-letter gets a `col_`
/// prefix, over-long names are truncated to 120 bytes plus `_trunc`, and the
/// result is lower-cased. The pipeline is idempotent:
/// `clean_identifier(clean_identifier(x)) == clean_identifier(x)`.
///
/// # Example
///
/// ```rust
/// use redlift::clean_identifier;
///
/// assert_eq!(clean_identifier("test name"), "test_name");
/// assert_eq!(clean_identifier("TestName"), "testname");
/// assert_eq!(clean_identifier("test-name!"), "test_name_");
/// ```
pub fn clean_identifier(raw: &str) -> String {
    let mut cleaned: String = raw
        .chars()
        .map(|c| match c {
            ' ' => '_',
            c if c.is_ascii_alphanumeric() || c == '_' || c == '$' => c,
            _ => '_',
        })
        .collect();

    let starts_valid = cleaned
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_valid {
        cleaned = format!("col_{cleaned}");
    }

    // All characters are ASCII at this point, so byte truncation is safe.
    if cleaned.len() > MAX_IDENTIFIER_BYTES {
        cleaned.truncate(TRUNCATED_BYTES);
        cleaned.push_str("_trunc");
    }

    cleaned.to_lowercase()
}

/// Rename columns that collide with reserved words or system column names.
///
/// With `fix` enabled, every offender gets a `_col` suffix and the mapping is
/// recorded; the returned dataset is a copy, the caller's dataset is never
/// mutated. With `fix` disabled the call fails with a
/// [`LoadError::NamingConflict`] enumerating all offenders at once.
pub fn rename_reserved_columns(
    dataset: &Dataset,
    fix: bool,
) -> LoadResult<(Dataset, BTreeMap<String, String>)> {
    let conflicts: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| is_reserved_word(&c.name) || is_system_column(&c.name))
        .map(|c| c.name.clone())
        .collect();

    if conflicts.is_empty() {
        return Ok((dataset.clone(), BTreeMap::new()));
    }
    if !fix {
        return Err(LoadError::NamingConflict(conflicts));
    }

    let mut renames = BTreeMap::new();
    let columns: Vec<Column> = dataset
        .columns()
        .iter()
        .map(|column| {
            if conflicts.contains(&column.name) {
                let renamed = format!("{}{}", column.name, RENAME_SUFFIX);
                renames.insert(column.name.clone(), renamed.clone());
                Column::new(renamed, column.domain, column.values.clone())
            } else {
                column.clone()
            }
        })
        .collect();

    Ok((
        Dataset::from_parts(columns, dataset.index().cloned()),
        renames,
    ))
}
