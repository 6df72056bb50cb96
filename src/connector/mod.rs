//! Warehouse connector abstraction
//!
//! The core never talks to a driver directly: it drives a [`Session`]
//! obtained from a [`Connector`]. Concrete connectors are registered in a
//! [`ConnectorRegistry`] built once at process start and passed by reference
//! into the orchestrator:
//! - `PostgresConnector`: postgres-wire driver (feature `postgres-backend`)
//! - `MemoryConnector`: always available; records statements for dry runs
//!   and tests
//!
//! One session is exclusively owned by one load call and is not safe for
//! concurrent use without external synchronization.

pub mod memory;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub use memory::{MemoryConnector, MemorySession};

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresConnector;

use crate::dataset::{ColumnDomain, Value};

/// Error type for connector operations
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Failed to establish a session
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The warehouse rejected a statement
    #[error("statement execution failed: {0}")]
    ExecutionFailed(String),

    /// The session was already closed
    #[error("session is closed")]
    SessionClosed,
}

/// Result type for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Connection parameters for opening a warehouse session
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// A warehouse driver capable of opening sessions
pub trait Connector: Send + Sync {
    /// Stable connector name used for registry lookup
    fn name(&self) -> &'static str;

    /// Open a new session
    fn connect(&self, params: &ConnectionParams) -> ConnectorResult<Box<dyn Session>>;
}

/// An open warehouse session.
///
/// Blocking, synchronous, single-owner. `execute_batch` binds one parameter
/// row at a time against a parameterized statement; values are never
/// interpolated into SQL text. `domains` carries one entry per column so
/// drivers can bind NULLs with the column's wire type.
pub trait Session {
    /// Execute a statement, returning the affected row count
    fn execute(&mut self, sql: &str) -> ConnectorResult<u64>;

    /// Execute a parameterized statement once per row, returning the total
    /// affected row count. `domains` and every row must have one entry per
    /// statement placeholder, in column order.
    fn execute_batch(
        &mut self,
        sql: &str,
        domains: &[ColumnDomain],
        rows: &[Vec<Value>],
    ) -> ConnectorResult<u64>;

    /// Commit the in-flight transaction
    fn commit(&mut self) -> ConnectorResult<()>;

    /// Roll back the in-flight transaction
    fn rollback(&mut self) -> ConnectorResult<()>;

    /// Close the session; further calls fail with `SessionClosed`
    fn close(&mut self) -> ConnectorResult<()>;
}

/// Registry of available connectors, built once by capability probing.
///
/// Probing is a construction-time decision: backends compiled into the binary
/// register themselves here, and the registry is passed by reference into the
/// orchestration layer. Core logic never consults global flags.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Probe for available connectors. Driver-backed connectors are listed
    /// ahead of the in-memory fallback.
    pub fn probe() -> Self {
        let mut connectors: Vec<Box<dyn Connector>> = Vec::new();

        #[cfg(feature = "postgres-backend")]
        connectors.push(Box::new(self::postgres::PostgresConnector));

        connectors.push(Box::new(MemoryConnector::new()));

        tracing::debug!(
            available = ?connectors.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "connector registry probed"
        );
        Self { connectors }
    }

    /// Look up a connector by name
    pub fn get(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// The preferred connector (first registered)
    pub fn preferred(&self) -> &dyn Connector {
        self.connectors[0].as_ref()
    }

    /// Names of all available connectors, in preference order
    pub fn names(&self) -> Vec<&'static str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }
}
