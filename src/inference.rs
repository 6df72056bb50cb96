//! Warehouse column type inference
//!
//! Maps each column's semantic value domain to a warehouse column type
//! string. The mapping is total and deterministic: every column receives
//! exactly one type, and repeated calls on the same dataset produce the same
//! mapping.

use crate::dataset::{Column, ColumnDomain, Dataset, Value};
use std::collections::BTreeMap;

/// Default size for text columns that are empty or all-null
const DEFAULT_TEXT_BYTES: usize = 256;

/// Headroom factor applied to the widest observed text value
const TEXT_SCALE: f64 = 1.2;

/// Bounds for generated VARCHAR sizes
const MIN_TEXT_BYTES: usize = 10;
const MAX_TEXT_BYTES: usize = 65535;

/// Infer a warehouse type for every column of the dataset.
///
/// # Example
///
/// ```rust
/// use redlift::{Column, ColumnDomain, Dataset, Value};
/// use redlift::inference::infer_types;
///
/// let dataset = Dataset::new(vec![Column::new(
///     "amount",
///     ColumnDomain::Float64,
///     vec![Value::Double(1.5)],
/// )])
/// .unwrap();
/// let types = infer_types(&dataset);
/// assert_eq!(types["amount"], "DOUBLE PRECISION");
/// ```
pub fn infer_types(dataset: &Dataset) -> BTreeMap<String, String> {
    dataset
        .columns()
        .iter()
        .map(|column| (column.name.clone(), infer_column_type(column)))
        .collect()
}

/// Infer the warehouse type for a single column
pub fn infer_column_type(column: &Column) -> String {
    match column.domain {
        ColumnDomain::Int16 => "SMALLINT".to_string(),
        ColumnDomain::Int32 => "INTEGER".to_string(),
        ColumnDomain::Int64 => "BIGINT".to_string(),
        ColumnDomain::Float32 => "REAL".to_string(),
        ColumnDomain::Float64 => "DOUBLE PRECISION".to_string(),
        ColumnDomain::Boolean => "BOOLEAN".to_string(),
        ColumnDomain::Timestamp => "TIMESTAMP".to_string(),
        ColumnDomain::Text => format!("VARCHAR({})", text_width(column)),
    }
}

/// Size a VARCHAR from the widest non-null value, scaled for headroom and
/// clamped to the dialect's representable range.
fn text_width(column: &Column) -> usize {
    let max_len = column
        .values
        .iter()
        .filter_map(|v| match v {
            Value::Text(s) => Some(s.len()),
            _ => None,
        })
        .max();

    match max_len {
        None => DEFAULT_TEXT_BYTES,
        Some(len) => {
            let scaled = (len as f64 * TEXT_SCALE).ceil() as usize;
            scaled.clamp(MIN_TEXT_BYTES, MAX_TEXT_BYTES)
        }
    }
}
