//! In-memory connector
//!
//! Records every statement instead of executing it. Always available in the
//! registry; used for dry runs and as the test double for the orchestrator.
//! Failures can be scripted per SQL fragment to exercise rollback paths.

use super::{ConnectionParams, Connector, ConnectorError, ConnectorResult, Session};
use crate::dataset::{ColumnDomain, Value};

/// Connector that hands out recording sessions
#[derive(Debug, Default)]
pub struct MemoryConnector;

impl MemoryConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for MemoryConnector {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn connect(&self, _params: &ConnectionParams) -> ConnectorResult<Box<dyn Session>> {
        Ok(Box::new(MemorySession::new()))
    }
}

/// One recorded batch execution
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    /// The parameterized statement text
    pub sql: String,
    /// Column domains the rows were bound with, in placeholder order
    pub domains: Vec<ColumnDomain>,
    /// Number of rows bound against it
    pub rows: usize,
}

/// Recording session
#[derive(Debug, Default)]
pub struct MemorySession {
    /// Plain statements in execution order
    pub statements: Vec<String>,
    /// Batched executions in order
    pub batches: Vec<BatchRecord>,
    /// Number of commits issued
    pub commits: usize,
    /// Number of rollbacks issued
    pub rollbacks: usize,
    closed: bool,
    fail_fragments: Vec<String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure: any statement containing `fragment` is rejected
    pub fn fail_when_sql_contains(&mut self, fragment: &str) {
        self.fail_fragments.push(fragment.to_string());
    }

    /// All recorded SQL (statements and batch templates) in order
    pub fn all_sql(&self) -> Vec<&str> {
        self.statements
            .iter()
            .map(String::as_str)
            .chain(self.batches.iter().map(|b| b.sql.as_str()))
            .collect()
    }

    fn check(&self, sql: &str) -> ConnectorResult<()> {
        if self.closed {
            return Err(ConnectorError::SessionClosed);
        }
        if let Some(fragment) = self.fail_fragments.iter().find(|f| sql.contains(f.as_str())) {
            return Err(ConnectorError::ExecutionFailed(format!(
                "scripted rejection of statement matching '{fragment}'"
            )));
        }
        Ok(())
    }
}

impl Session for MemorySession {
    fn execute(&mut self, sql: &str) -> ConnectorResult<u64> {
        self.check(sql)?;
        self.statements.push(sql.to_string());
        Ok(0)
    }

    fn execute_batch(
        &mut self,
        sql: &str,
        domains: &[ColumnDomain],
        rows: &[Vec<Value>],
    ) -> ConnectorResult<u64> {
        self.check(sql)?;
        self.batches.push(BatchRecord {
            sql: sql.to_string(),
            domains: domains.to_vec(),
            rows: rows.len(),
        });
        Ok(rows.len() as u64)
    }

    fn commit(&mut self) -> ConnectorResult<()> {
        if self.closed {
            return Err(ConnectorError::SessionClosed);
        }
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> ConnectorResult<()> {
        if self.closed {
            return Err(ConnectorError::SessionClosed);
        }
        self.rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> ConnectorResult<()> {
        self.closed = true;
        Ok(())
    }
}
