//! Error types for load operations
//!
//! All validation errors are raised before any statement executes against the
//! warehouse. Execution errors carry the target table and the load phase they
//! occurred in, plus the underlying connector error as their source.

use crate::connector::ConnectorError;
use thiserror::Error;

/// Error type for load operations
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to establish a warehouse session
    #[error("connection failed: {0}")]
    Connection(String),

    /// Dataset failed validation (bad types, encoding violations, missing or
    /// non-unique key columns)
    #[error("data validation failed: {0}")]
    DataValidation(String),

    /// Column names collide with reserved words or system columns and
    /// `fix_reserved_words` is disabled. Carries the complete list of
    /// offenders so the caller sees everything in one round trip.
    #[error("naming conflict: columns [{}] collide with reserved words or system columns", .0.join(", "))]
    NamingConflict(Vec<String>),

    /// A schema statement was rejected by the warehouse
    #[error("DDL execution failed on {table} during {phase}: {source}")]
    DdlExecution {
        table: String,
        phase: &'static str,
        #[source]
        source: ConnectorError,
    },

    /// An insert statement was rejected by the warehouse
    #[error("DML execution failed on {table} during {phase}: {source}")]
    DmlExecution {
        table: String,
        phase: &'static str,
        #[source]
        source: ConnectorError,
    },
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;
