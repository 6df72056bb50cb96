//! Key, sort and distribution specifications
//!
//! Validates primary-key, sort-key and distribution-key specifications
//! against a dataset before any SQL is generated. All checks here run before
//! the warehouse is touched.

use crate::dataset::{Column, Dataset, DatasetIndex};
use crate::error::{LoadError, LoadResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Primary-key specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySpec {
    /// No primary key
    #[default]
    None,
    /// Single-column key; the column must exist
    Single(String),
    /// Composite key; all columns must exist and the projection onto them
    /// must be unique over every row
    Composite(Vec<String>),
    /// Derive the key from the dataset's named row index
    AutoFromIndex,
}

/// Outcome of key resolution.
///
/// The auto-from-index path both selects the key columns and materializes the
/// index into regular columns; the mutated dataset is returned here explicitly
/// so the key list and the data can never silently diverge.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    /// Final ordered key column names (empty for no key)
    pub columns: Vec<String>,
    /// Replacement working dataset, present only when resolution had to
    /// materialize index columns
    pub dataset: Option<Dataset>,
}

/// Physical distribution style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistStyle {
    Even,
    All,
    Auto,
    Key,
}

impl DistStyle {
    /// The dialect keyword rendered into DDL
    pub(crate) fn sql_keyword(&self) -> &'static str {
        match self {
            DistStyle::Even => "EVEN",
            DistStyle::All => "ALL",
            DistStyle::Auto => "AUTO",
            DistStyle::Key => "KEY",
        }
    }
}

impl std::str::FromStr for DistStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "even" => Ok(DistStyle::Even),
            "all" => Ok(DistStyle::All),
            "auto" => Ok(DistStyle::Auto),
            "key" => Ok(DistStyle::Key),
            _ => Err(format!("unknown distribution style: {s}")),
        }
    }
}

impl std::fmt::Display for DistStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_keyword().to_lowercase())
    }
}

/// Distribution specification: a style plus, for `key` style, the column the
/// rows are distributed by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistSpec {
    pub style: DistStyle,
    pub key_column: Option<String>,
}

/// Resolve a key specification against a dataset.
///
/// See [`KeySpec`] for the per-variant rules. Composite uniqueness is a full
/// projection check over all rows.
pub fn resolve_key(spec: &KeySpec, dataset: &Dataset) -> LoadResult<ResolvedKey> {
    match spec {
        KeySpec::None => Ok(ResolvedKey {
            columns: Vec::new(),
            dataset: None,
        }),
        KeySpec::Single(name) => {
            if !dataset.has_column(name) {
                return Err(LoadError::DataValidation(format!(
                    "primary key column '{name}' not found in dataset"
                )));
            }
            Ok(ResolvedKey {
                columns: vec![name.clone()],
                dataset: None,
            })
        }
        KeySpec::Composite(names) => {
            for name in names {
                if !dataset.has_column(name) {
                    return Err(LoadError::DataValidation(format!(
                        "primary key column '{name}' not found in dataset"
                    )));
                }
            }
            let projection: Vec<&Column> = names
                .iter()
                .filter_map(|name| dataset.column(name))
                .collect();
            check_unique(&projection, dataset.rows()).map_err(|row| {
                LoadError::DataValidation(format!(
                    "composite primary key ({}) has a duplicate tuple at row {row}",
                    names.join(", ")
                ))
            })?;
            Ok(ResolvedKey {
                columns: names.clone(),
                dataset: None,
            })
        }
        KeySpec::AutoFromIndex => resolve_auto_key(dataset),
    }
}

/// Auto key: requires a named, unique row index; materializes the index
/// columns ahead of the data columns in a new dataset.
fn resolve_auto_key(dataset: &Dataset) -> LoadResult<ResolvedKey> {
    let index: &DatasetIndex = dataset.index().ok_or_else(|| {
        LoadError::DataValidation(
            "auto primary key requires a named row index; the dataset carries the default \
             sequential index"
                .to_string(),
        )
    })?;

    let index_columns: Vec<&Column> = index.columns().iter().collect();
    check_unique(&index_columns, index.rows()).map_err(|row| {
        LoadError::DataValidation(format!(
            "auto primary key requires a unique index; duplicate tuple at row {row}"
        ))
    })?;

    for column in index.columns() {
        if dataset.has_column(&column.name) {
            return Err(LoadError::DataValidation(format!(
                "index column '{}' collides with an existing dataset column",
                column.name
            )));
        }
    }

    let key_columns: Vec<String> = index.columns().iter().map(|c| c.name.clone()).collect();
    let mut columns: Vec<Column> = index.columns().to_vec();
    columns.extend(dataset.columns().iter().cloned());

    Ok(ResolvedKey {
        columns: key_columns,
        dataset: Some(Dataset::from_parts(columns, None)),
    })
}

/// Returns `Err(row)` for the first row whose projected tuple duplicates an
/// earlier one
fn check_unique(projection: &[&Column], rows: usize) -> Result<(), usize> {
    let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(rows);
    for row in 0..rows {
        let tuple: Vec<String> = projection
            .iter()
            .map(|column| column.values[row].key_repr())
            .collect();
        if !seen.insert(tuple) {
            return Err(row);
        }
    }
    Ok(())
}

/// Every sort column must exist; the given order is preserved as the physical
/// sort precedence.
pub fn validate_sort_spec(sortkey: &[String], dataset: &Dataset) -> LoadResult<()> {
    for name in sortkey {
        if !dataset.has_column(name) {
            return Err(LoadError::DataValidation(format!(
                "sort key column '{name}' not found in dataset"
            )));
        }
    }
    Ok(())
}

/// `key` style requires a present key column; every other style ignores it.
pub fn validate_dist_spec(spec: &DistSpec, dataset: &Dataset) -> LoadResult<()> {
    if spec.style == DistStyle::Key {
        match &spec.key_column {
            None => {
                return Err(LoadError::DataValidation(
                    "diststyle key requires a distkey column".to_string(),
                ));
            }
            Some(name) if !dataset.has_column(name) => {
                return Err(LoadError::DataValidation(format!(
                    "distribution key column '{name}' not found in dataset"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
