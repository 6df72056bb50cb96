//! Postgres-wire connector
//!
//! Redshift speaks the postgres wire protocol, so one synchronous postgres
//! client covers both. Transactions follow driver convention: the first
//! statement after connect or commit implicitly opens one, and it stays open
//! until `commit` or `rollback`.

use super::{ConnectionParams, Connector, ConnectorError, ConnectorResult, Session};
use crate::dataset::{ColumnDomain, Value};
use chrono::NaiveDateTime;
use postgres::types::ToSql;
use postgres::{Client, NoTls};

// Typed NULLs; the driver's checked binding rejects a NULL whose Rust type
// does not match the column's wire type.
static NULL_SMALLINT: Option<i16> = None;
static NULL_INT: Option<i32> = None;
static NULL_BIGINT: Option<i64> = None;
static NULL_REAL: Option<f32> = None;
static NULL_DOUBLE: Option<f64> = None;
static NULL_BOOL: Option<bool> = None;
static NULL_TIMESTAMP: Option<NaiveDateTime> = None;
static NULL_TEXT: Option<String> = None;

/// Postgres-wire connector
#[derive(Debug, Default)]
pub struct PostgresConnector;

impl Connector for PostgresConnector {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn connect(&self, params: &ConnectionParams) -> ConnectorResult<Box<dyn Session>> {
        let mut config = postgres::Config::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(&params.database)
            .user(&params.user)
            .password(&params.password);

        let client = config
            .connect(NoTls)
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        tracing::info!(host = %params.host, database = %params.database, "session opened");
        Ok(Box::new(PostgresSession {
            client,
            in_transaction: false,
            closed: false,
        }))
    }
}

struct PostgresSession {
    client: Client,
    in_transaction: bool,
    closed: bool,
}

impl PostgresSession {
    fn guard(&self) -> ConnectorResult<()> {
        if self.closed {
            return Err(ConnectorError::SessionClosed);
        }
        Ok(())
    }

    fn ensure_transaction(&mut self) -> ConnectorResult<()> {
        if !self.in_transaction {
            self.client
                .batch_execute("BEGIN")
                .map_err(|e| ConnectorError::ExecutionFailed(e.to_string()))?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn end_transaction(&mut self, sql: &'static str) -> ConnectorResult<()> {
        if self.in_transaction {
            self.client
                .batch_execute(sql)
                .map_err(|e| ConnectorError::ExecutionFailed(e.to_string()))?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

impl Session for PostgresSession {
    fn execute(&mut self, sql: &str) -> ConnectorResult<u64> {
        self.guard()?;
        self.ensure_transaction()?;
        self.client
            .execute(sql, &[])
            .map_err(|e| ConnectorError::ExecutionFailed(e.to_string()))
    }

    fn execute_batch(
        &mut self,
        sql: &str,
        domains: &[ColumnDomain],
        rows: &[Vec<Value>],
    ) -> ConnectorResult<u64> {
        self.guard()?;
        self.ensure_transaction()?;
        let statement = self
            .client
            .prepare(sql)
            .map_err(|e| ConnectorError::ExecutionFailed(e.to_string()))?;

        let mut affected = 0;
        for row in rows {
            let params: Vec<&(dyn ToSql + Sync)> = row
                .iter()
                .zip(domains)
                .map(|(value, domain)| bind_value(value, *domain))
                .collect();
            affected += self
                .client
                .execute(&statement, &params)
                .map_err(|e| ConnectorError::ExecutionFailed(e.to_string()))?;
        }
        Ok(affected)
    }

    fn commit(&mut self) -> ConnectorResult<()> {
        self.guard()?;
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> ConnectorResult<()> {
        self.guard()?;
        self.end_transaction("ROLLBACK")
    }

    fn close(&mut self) -> ConnectorResult<()> {
        if !self.closed {
            // an uncommitted transaction must not survive the session
            let _ = self.end_transaction("ROLLBACK");
            self.closed = true;
        }
        Ok(())
    }
}

fn bind_value(value: &Value, domain: ColumnDomain) -> &(dyn ToSql + Sync) {
    match value {
        Value::Null => null_for(domain),
        Value::SmallInt(v) => v,
        Value::Int(v) => v,
        Value::BigInt(v) => v,
        Value::Real(v) => v,
        Value::Double(v) => v,
        Value::Bool(v) => v,
        Value::Timestamp(v) => v,
        Value::Text(v) => v,
    }
}

fn null_for(domain: ColumnDomain) -> &'static (dyn ToSql + Sync) {
    match domain {
        ColumnDomain::Int16 => &NULL_SMALLINT,
        ColumnDomain::Int32 => &NULL_INT,
        ColumnDomain::Int64 => &NULL_BIGINT,
        ColumnDomain::Float32 => &NULL_REAL,
        ColumnDomain::Float64 => &NULL_DOUBLE,
        ColumnDomain::Boolean => &NULL_BOOL,
        ColumnDomain::Timestamp => &NULL_TIMESTAMP,
        ColumnDomain::Text => &NULL_TEXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgres::types::Type;

    fn checks_against(value: &Value, domain: ColumnDomain, ty: &Type) -> bool {
        let mut buf = bytes::BytesMut::new();
        bind_value(value, domain).to_sql_checked(ty, &mut buf).is_ok()
    }

    #[test]
    fn test_null_binds_with_the_column_wire_type() {
        let null = Value::Null;
        assert!(checks_against(&null, ColumnDomain::Int16, &Type::INT2));
        assert!(checks_against(&null, ColumnDomain::Int32, &Type::INT4));
        assert!(checks_against(&null, ColumnDomain::Int64, &Type::INT8));
        assert!(checks_against(&null, ColumnDomain::Float32, &Type::FLOAT4));
        assert!(checks_against(&null, ColumnDomain::Float64, &Type::FLOAT8));
        assert!(checks_against(&null, ColumnDomain::Boolean, &Type::BOOL));
        assert!(checks_against(&null, ColumnDomain::Timestamp, &Type::TIMESTAMP));
        assert!(checks_against(&null, ColumnDomain::Text, &Type::VARCHAR));
    }

    #[test]
    fn test_text_typed_null_is_rejected_for_int_columns() {
        let mut buf = bytes::BytesMut::new();
        assert!(NULL_TEXT.to_sql_checked(&Type::INT4, &mut buf).is_err());
    }

    #[test]
    fn test_non_null_values_bind_with_their_own_type() {
        assert!(checks_against(&Value::Int(7), ColumnDomain::Int32, &Type::INT4));
        assert!(checks_against(
            &Value::Text("x".to_string()),
            ColumnDomain::Text,
            &Type::VARCHAR
        ));
    }
}
