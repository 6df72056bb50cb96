//! In-memory columnar data model
//!
//! The [`Dataset`] is the single canonical table representation the core
//! operates on. Adapters convert external row or column frameworks into a
//! `Dataset` at the boundary; nothing inside the core branches on where the
//! data came from.
//!
//! Datasets are immutable once captured for a load call. Sanitization and
//! auto-key resolution return new datasets instead of mutating the caller's.

use crate::error::{LoadError, LoadResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single cell value. `Null` is valid in any column domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Whether this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Deep size estimate in bytes, string payloads included.
    ///
    /// Used by the chunk planner to derive an average row width; the numbers
    /// track warehouse storage widths, not Rust in-memory layout.
    pub fn estimated_size(&self) -> usize {
        match self {
            Value::Null => 1,
            Value::SmallInt(_) => 2,
            Value::Int(_) => 4,
            Value::BigInt(_) => 8,
            Value::Real(_) => 4,
            Value::Double(_) => 8,
            Value::Bool(_) => 1,
            Value::Timestamp(_) => 8,
            Value::Text(s) => s.len(),
        }
    }

    /// Canonical string encoding used for uniqueness checks.
    ///
    /// Floats are encoded by bit pattern so the check is total (NaN included).
    pub(crate) fn key_repr(&self) -> String {
        match self {
            Value::Null => "n".to_string(),
            Value::SmallInt(v) => format!("i:{v}"),
            Value::Int(v) => format!("i:{v}"),
            Value::BigInt(v) => format!("i:{v}"),
            Value::Real(v) => format!("f:{:08x}", v.to_bits()),
            Value::Double(v) => format!("d:{:016x}", v.to_bits()),
            Value::Bool(v) => format!("b:{v}"),
            Value::Timestamp(v) => format!("t:{v}"),
            Value::Text(v) => format!("s:{v}"),
        }
    }

    fn matches_domain(&self, domain: ColumnDomain) -> bool {
        matches!(
            (self, domain),
            (Value::Null, _)
                | (Value::SmallInt(_), ColumnDomain::Int16)
                | (Value::Int(_), ColumnDomain::Int32)
                | (Value::BigInt(_), ColumnDomain::Int64)
                | (Value::Real(_), ColumnDomain::Float32)
                | (Value::Double(_), ColumnDomain::Float64)
                | (Value::Bool(_), ColumnDomain::Boolean)
                | (Value::Timestamp(_), ColumnDomain::Timestamp)
                | (Value::Text(_), ColumnDomain::Text)
        )
    }
}

/// Semantic value domain of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDomain {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    Timestamp,
    Text,
}

/// A named, typed, ordered sequence of possibly-null values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Semantic value domain
    pub domain: ColumnDomain,
    /// Ordered values; length equals the dataset row count
    pub values: Vec<Value>,
}

impl Column {
    /// Create a new column with the given name, domain and values
    pub fn new(name: impl Into<String>, domain: ColumnDomain, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            domain,
            values,
        }
    }

    /// Sum of the estimated sizes of all values in this column
    pub fn estimated_size(&self) -> usize {
        self.values.iter().map(Value::estimated_size).sum()
    }
}

/// A named, non-default row index carried alongside a dataset.
///
/// A default sequential index is represented by the absence of a
/// `DatasetIndex` on the dataset; only explicitly named indexes qualify for
/// auto primary-key resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetIndex {
    columns: Vec<Column>,
}

impl DatasetIndex {
    /// Create a named index from one or more index columns.
    ///
    /// Fails when the columns are unnamed or have unequal lengths.
    pub fn new(columns: Vec<Column>) -> LoadResult<Self> {
        if columns.is_empty() {
            return Err(LoadError::DataValidation(
                "dataset index requires at least one column".to_string(),
            ));
        }
        if columns.iter().any(|c| c.name.is_empty()) {
            return Err(LoadError::DataValidation(
                "dataset index columns must be named".to_string(),
            ));
        }
        let rows = columns[0].values.len();
        if columns.iter().any(|c| c.values.len() != rows) {
            return Err(LoadError::DataValidation(
                "dataset index columns must have equal lengths".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    /// Index columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of index rows
    pub fn rows(&self) -> usize {
        self.columns[0].values.len()
    }
}

/// Ordered collection of named, equal-length columns.
///
/// # Example
///
/// ```rust
/// use redlift::{Column, ColumnDomain, Dataset, Value};
///
/// let dataset = Dataset::new(vec![Column::new(
///     "id",
///     ColumnDomain::Int32,
///     vec![Value::Int(1), Value::Int(2)],
/// )])
/// .unwrap();
/// assert_eq!(dataset.rows(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    index: Option<DatasetIndex>,
}

impl Dataset {
    /// Create a dataset from ordered columns.
    ///
    /// Fails when columns are unnamed, have unequal lengths, duplicate names,
    /// or contain values outside their declared domain.
    pub fn new(columns: Vec<Column>) -> LoadResult<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for column in &columns {
            if column.name.is_empty() {
                return Err(LoadError::DataValidation(
                    "dataset columns must be named".to_string(),
                ));
            }
            if column.values.len() != rows {
                return Err(LoadError::DataValidation(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.values.len(),
                    rows
                )));
            }
            if let Some(bad) = column
                .values
                .iter()
                .position(|v| !v.matches_domain(column.domain))
            {
                return Err(LoadError::DataValidation(format!(
                    "column '{}' row {} does not match domain {:?}",
                    column.name, bad, column.domain
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(LoadError::DataValidation(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            index: None,
        })
    }

    /// Attach a named row index. Fails when the index row count differs from
    /// the dataset row count.
    pub fn with_index(mut self, index: DatasetIndex) -> LoadResult<Self> {
        if index.rows() != self.rows() {
            return Err(LoadError::DataValidation(format!(
                "index has {} rows, dataset has {}",
                index.rows(),
                self.rows()
            )));
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Rebuild a dataset from already-validated parts. Callers must preserve
    /// the equal-length invariant.
    pub(crate) fn from_parts(columns: Vec<Column>, index: Option<DatasetIndex>) -> Self {
        Self { columns, index }
    }

    /// Columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The named row index, if any
    pub fn index(&self) -> Option<&DatasetIndex> {
        self.index.as_ref()
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// Whether the dataset has zero rows
    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column with this name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Deep size estimate of the whole dataset in bytes
    pub fn estimated_size(&self) -> usize {
        self.columns.iter().map(Column::estimated_size).sum()
    }

    /// Materialize one row in column order
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.values[index].clone())
            .collect()
    }
}

/// Resolved, sanitized destination for one load call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTarget {
    /// Sanitized schema name
    pub schema: String,
    /// Sanitized table name
    pub table: String,
}

impl TableTarget {
    /// Render the fully qualified `schema.table` identifier
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}
