//! redlift - Bulk-load library for postgres-wire analytical warehouses
//!
//! Provides the full path from an in-memory columnar dataset to a loaded
//! warehouse table:
//! - Schema inference (warehouse types from column domains and observed data)
//! - Identifier sanitization and reserved-word handling
//! - Primary/sort/distribution key validation
//! - Byte-budgeted chunk planning
//! - DDL and parameterized DML generation
//! - Load orchestration with test-only and estimate-only modes
//!
//! All execution is synchronous over an exclusively-owned [`Session`];
//! concurrency belongs to the caller.

pub mod chunk;
pub mod connector;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod keys;
pub mod loader;
pub mod reference;
pub mod sanitize;
pub mod sql;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkPlan};
#[cfg(feature = "postgres-backend")]
pub use connector::PostgresConnector;
pub use connector::{
    ConnectionParams, Connector, ConnectorError, ConnectorRegistry, ConnectorResult,
    MemoryConnector, MemorySession, Session,
};
pub use dataset::{Column, ColumnDomain, Dataset, DatasetIndex, TableTarget, Value};
pub use error::{LoadError, LoadResult};
pub use inference::infer_types;
pub use keys::{DistSpec, DistStyle, KeySpec, ResolvedKey};
pub use loader::{
    DdlTestResult, EstimateResult, IfExists, LoadConfig, LoadOrchestrator, LoadOutcome,
    LoadStatus, LoadSummary, Loader,
};
pub use sanitize::{clean_identifier, rename_reserved_columns};
pub use sql::{DdlGenerator, DmlGenerator};
