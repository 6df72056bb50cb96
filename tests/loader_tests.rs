//! End-to-end orchestration tests over the recording session

use redlift::connector::memory::MemorySession;
use redlift::connector::{ConnectionParams, ConnectorError, ConnectorRegistry, Session};
use redlift::dataset::{Column, ColumnDomain, Dataset, DatasetIndex, Value};
use redlift::error::LoadError;
use redlift::keys::{DistStyle, KeySpec};
use redlift::loader::{IfExists, LoadConfig, LoadOrchestrator, LoadOutcome, LoadStatus, Loader};

fn int_column(name: &str, values: &[i32]) -> Column {
    Column::new(
        name,
        ColumnDomain::Int32,
        values.iter().map(|v| Value::Int(*v)).collect(),
    )
}

fn text_column(name: &str, values: &[&str]) -> Column {
    Column::new(
        name,
        ColumnDomain::Text,
        values.iter().map(|v| Value::Text(v.to_string())).collect(),
    )
}

fn sales_dataset() -> Dataset {
    Dataset::new(vec![
        int_column("id", &[1, 2, 3]),
        text_column("region", &["north", "south", "east"]),
    ])
    .unwrap()
}

/// Seven rows of ~300 KB text; at a 1 MB budget this plans chunks of 3, 3, 1.
fn wide_text_dataset() -> Dataset {
    let big = "x".repeat(300_000);
    let values: Vec<&str> = (0..7).map(|_| big.as_str()).collect();
    Dataset::new(vec![text_column("payload", &values)]).unwrap()
}

#[test]
fn test_basic_load_creates_table_and_commits_once() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.table, "public.sales");
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(summary.chunks_processed, 1);
    assert!(summary.column_mapping.is_empty());

    assert_eq!(session.statements.len(), 1);
    assert!(session.statements[0].starts_with("CREATE TABLE public.sales (\n"));
    assert_eq!(session.batches.len(), 1);
    assert!(
        session.batches[0]
            .sql
            .starts_with("INSERT INTO public.sales (id, region) VALUES ($1, $2)")
    );
    assert_eq!(session.batches[0].rows, 3);
    assert_eq!(session.commits, 1);
    assert_eq!(session.rollbacks, 0);
}

#[test]
fn test_append_auto_create_uses_if_not_exists() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;
    config.if_exists = IfExists::Append;

    LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    assert!(session.statements[0].starts_with("CREATE TABLE IF NOT EXISTS public.sales"));
}

#[test]
fn test_replace_backs_up_then_drops_then_recreates() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.if_exists = IfExists::Replace;

    LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    assert_eq!(session.statements.len(), 4);
    assert_eq!(session.statements[0], "DROP TABLE IF EXISTS public.sales_backup");
    assert_eq!(
        session.statements[1],
        "CREATE TABLE public.sales_backup AS SELECT * FROM public.sales"
    );
    assert_eq!(session.statements[2], "DROP TABLE IF EXISTS public.sales");
    assert!(session.statements[3].starts_with("CREATE TABLE public.sales (\n"));
    // one commit for the backup unit, one for the load itself
    assert_eq!(session.commits, 2);
}

#[test]
fn test_replace_without_backup_skips_copy() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.if_exists = IfExists::Replace;
    config.backup = false;

    LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    assert!(session.all_sql().iter().all(|sql| !sql.contains("_backup")));
    assert_eq!(session.commits, 1);
}

/// Session double whose backup copy fails the way a driver reports a missing
/// relation. The load must treat that as benign and continue.
struct MissingTargetSession {
    inner: MemorySession,
}

impl Session for MissingTargetSession {
    fn execute(&mut self, sql: &str) -> Result<u64, ConnectorError> {
        if sql.contains("AS SELECT * FROM") {
            return Err(ConnectorError::ExecutionFailed(
                "relation \"public.sales\" does not exist".to_string(),
            ));
        }
        self.inner.execute(sql)
    }

    fn execute_batch(
        &mut self,
        sql: &str,
        domains: &[ColumnDomain],
        rows: &[Vec<Value>],
    ) -> Result<u64, ConnectorError> {
        self.inner.execute_batch(sql, domains, rows)
    }

    fn commit(&mut self) -> Result<(), ConnectorError> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), ConnectorError> {
        self.inner.rollback()
    }

    fn close(&mut self) -> Result<(), ConnectorError> {
        self.inner.close()
    }
}

#[test]
fn test_replace_with_missing_target_skips_backup_and_loads() {
    let mut session = MissingTargetSession {
        inner: MemorySession::new(),
    };
    let mut config = LoadConfig::new("sales");
    config.if_exists = IfExists::Replace;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    assert_eq!(outcome.summary().unwrap().rows_inserted, 3);
    assert_eq!(session.inner.commits, 1);
    assert_eq!(session.inner.rollbacks, 1);
}

#[test]
fn test_backup_failure_other_than_missing_target_aborts() {
    let mut session = MemorySession::new();
    session.fail_when_sql_contains("AS SELECT * FROM");
    let mut config = LoadConfig::new("sales");
    config.if_exists = IfExists::Replace;

    let err = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::DdlExecution {
            phase: "backup",
            ..
        }
    ));
    assert!(session.batches.is_empty());
    assert_eq!(session.commits, 0);
}

#[test]
fn test_reserved_columns_renamed_and_reported() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![
        int_column("id", &[1, 2]),
        text_column("group", &["a", "b"]),
    ])
    .unwrap();
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap();

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.column_mapping.get("group").unwrap(), "group_col");
    assert!(session.statements[0].contains("group_col"));
    assert!(session.batches[0].sql.contains("group_col"));
}

#[test]
fn test_reserved_columns_fail_when_renaming_disabled() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![
        text_column("group", &["a"]),
        text_column("order", &["b"]),
    ])
    .unwrap();
    let mut config = LoadConfig::new("sales");
    config.fix_reserved_words = false;

    let err = LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap_err();

    match err {
        LoadError::NamingConflict(offenders) => {
            assert_eq!(offenders, vec!["group".to_string(), "order".to_string()]);
        }
        other => panic!("expected NamingConflict, got {other:?}"),
    }
    assert!(session.all_sql().is_empty());
}

#[test]
fn test_chunked_load_inserts_in_order() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("events");
    config.auto_create = true;
    config.chunk_size_mb = 1;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&wide_text_dataset(), &config)
        .unwrap();

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.rows_inserted, 7);
    assert_eq!(summary.chunks_processed, 3);

    let chunk_rows: Vec<usize> = session.batches.iter().map(|b| b.rows).collect();
    assert_eq!(chunk_rows, vec![3, 3, 1]);
    // all chunks run against the same template, one commit at the end
    assert!(session.batches.iter().all(|b| b.sql == session.batches[0].sql));
    assert_eq!(session.commits, 1);
}

#[test]
fn test_insert_failure_rolls_back_without_commit() {
    let mut session = MemorySession::new();
    session.fail_when_sql_contains("INSERT INTO");
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;

    let err = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::DmlExecution {
            phase: "insert",
            ..
        }
    ));
    assert_eq!(session.commits, 0);
    assert_eq!(session.rollbacks, 1);
}

#[test]
fn test_validation_failure_issues_no_sql() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.primary_key = KeySpec::Single("missing".to_string());

    let err = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap_err();

    assert!(matches!(err, LoadError::DataValidation(_)));
    assert!(session.all_sql().is_empty());
    assert_eq!(session.commits, 0);
}

#[test]
fn test_nul_bytes_rejected_before_any_statement() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![text_column("note", &["fine", "bad\0byte"])]).unwrap();
    let config = LoadConfig::new("notes");

    let err = LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap_err();

    assert!(matches!(err, LoadError::DataValidation(_)));
    assert!(session.all_sql().is_empty());
}

#[test]
fn test_ddl_test_mode_uses_temporary_table_and_rolls_back() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.test_only = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    let result = match outcome {
        LoadOutcome::DdlTest(result) => result,
        other => panic!("expected DdlTest outcome, got {other:?}"),
    };
    assert_eq!(result.status, LoadStatus::Success);
    assert!(result.error.is_none());

    assert!(session.statements[0].starts_with("CREATE TEMPORARY TABLE sales_ddl_test"));
    assert_eq!(session.statements[1], "DROP TABLE sales_ddl_test");
    assert!(session.batches.is_empty());
    assert_eq!(session.commits, 0);
    assert_eq!(session.rollbacks, 1);
}

#[test]
fn test_ddl_test_mode_captures_failure_instead_of_raising() {
    let mut session = MemorySession::new();
    session.fail_when_sql_contains("CREATE TEMPORARY TABLE");
    let mut config = LoadConfig::new("sales");
    config.test_only = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    let result = match outcome {
        LoadOutcome::DdlTest(result) => result,
        other => panic!("expected DdlTest outcome, got {other:?}"),
    };
    assert_eq!(result.status, LoadStatus::Failed);
    assert!(result.error.unwrap().contains("scripted rejection"));
    assert_eq!(session.rollbacks, 1);
}

#[test]
fn test_estimate_mode_times_first_chunk_and_extrapolates() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("events");
    config.estimate_only = true;
    config.chunk_size_mb = 1;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&wide_text_dataset(), &config)
        .unwrap();

    let estimate = match outcome {
        LoadOutcome::Estimate(estimate) => estimate,
        other => panic!("expected Estimate outcome, got {other:?}"),
    };
    assert_eq!(estimate.status, LoadStatus::Estimated);
    assert_eq!(
        serde_json::to_value(&estimate).unwrap()["status"],
        "estimated"
    );
    assert_eq!(estimate.total_chunks, 3);
    assert_eq!(estimate.total_rows, 7);
    assert_eq!(estimate.first_chunk_rows, 3);
    assert!(
        (estimate.estimated_total_time - estimate.first_chunk_time * 3.0).abs() < f64::EPSILON
    );

    assert!(session.statements[0].starts_with("CREATE TEMPORARY TABLE events_estimate"));
    assert_eq!(session.batches.len(), 1);
    assert_eq!(session.batches[0].rows, 3);
    assert!(session.batches[0].sql.contains("INSERT INTO events_estimate"));
    assert_eq!(session.statements[1], "DROP TABLE events_estimate");
    assert_eq!(session.commits, 0);
    assert_eq!(session.rollbacks, 1);
}

#[test]
fn test_estimate_mode_on_empty_dataset_short_circuits() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![int_column("id", &[])]).unwrap();
    let mut config = LoadConfig::new("events");
    config.estimate_only = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap();

    let estimate = match outcome {
        LoadOutcome::Estimate(estimate) => estimate,
        other => panic!("expected Estimate outcome, got {other:?}"),
    };
    assert_eq!(estimate.status, LoadStatus::Empty);
    assert_eq!(estimate.total_chunks, 0);
    assert_eq!(estimate.estimated_total_time, 0.0);
    assert!(session.all_sql().is_empty());
}

#[test]
fn test_key_sort_and_dist_flow_into_ddl() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;
    config.primary_key = KeySpec::Single("id".to_string());
    config.sortkey = vec!["region".to_string()];
    config.diststyle = Some(DistStyle::Key);
    config.distkey = Some("id".to_string());
    config.column_types.insert("id".to_string(), "BIGINT".to_string());
    config
        .compress_columns
        .insert("region".to_string(), "lzo".to_string());

    LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    let ddl = &session.statements[0];
    assert!(ddl.contains("  id BIGINT"));
    assert!(ddl.contains("  region VARCHAR("));
    assert!(ddl.contains("ENCODE lzo"));
    assert!(ddl.contains("PRIMARY KEY (id)"));
    assert!(ddl.contains("SORTKEY (region)"));
    assert!(ddl.contains("DISTSTYLE KEY"));
    assert!(ddl.contains("DISTKEY (id)"));
}

#[test]
fn test_bare_distkey_implies_key_distribution() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;
    config.distkey = Some("id".to_string());

    LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    assert!(session.statements[0].contains("DISTSTYLE KEY"));
    assert!(session.statements[0].contains("DISTKEY (id)"));
}

#[test]
fn test_auto_key_materializes_index_ahead_of_data() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![text_column("region", &["north", "south"])])
        .unwrap()
        .with_index(DatasetIndex::new(vec![int_column("event_id", &[10, 11])]).unwrap())
        .unwrap();
    let mut config = LoadConfig::new("events");
    config.auto_create = true;
    config.primary_key = KeySpec::AutoFromIndex;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap();

    assert_eq!(outcome.summary().unwrap().rows_inserted, 2);
    let ddl = &session.statements[0];
    assert!(ddl.contains("PRIMARY KEY (event_id)"));
    // index column leads the data columns
    assert!(
        session.batches[0]
            .sql
            .starts_with("INSERT INTO public.events (event_id, region)")
    );
}

#[test]
fn test_destination_override_wins_over_schema_and_table() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("ignored");
    config.schema = "also_ignored".to_string();
    config.destination = Some("analytics.daily_sales".to_string());
    config.auto_create = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    assert_eq!(outcome.summary().unwrap().table, "analytics.daily_sales");
    assert!(session.statements[0].contains("analytics.daily_sales"));
}

#[test]
fn test_empty_dataset_load_creates_table_with_no_rows() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![int_column("id", &[])]).unwrap();
    let mut config = LoadConfig::new("empty");
    config.auto_create = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap();

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.rows_inserted, 0);
    assert_eq!(summary.chunks_processed, 0);
    assert_eq!(session.statements.len(), 1);
    assert!(session.batches.is_empty());
    assert_eq!(session.commits, 1);
}

#[test]
fn test_null_rows_carry_their_column_domains_to_the_session() {
    let mut session = MemorySession::new();
    let dataset = Dataset::new(vec![
        Column::new(
            "id",
            ColumnDomain::Int32,
            vec![Value::Int(1), Value::Null],
        ),
        Column::new(
            "seen_at",
            ColumnDomain::Timestamp,
            vec![Value::Null, Value::Null],
        ),
    ])
    .unwrap();
    let config = LoadConfig::new("events");

    LoadOrchestrator::new(&mut session)
        .load(&dataset, &config)
        .unwrap();

    assert_eq!(
        session.batches[0].domains,
        vec![ColumnDomain::Int32, ColumnDomain::Timestamp]
    );
}

#[test]
fn test_config_round_trips_through_json() {
    let mut config = LoadConfig::new("sales");
    config.if_exists = IfExists::Replace;
    config.primary_key = KeySpec::Composite(vec!["id".to_string(), "region".to_string()]);
    config.diststyle = Some(DistStyle::Even);

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"if_exists\":\"replace\""));
    let back: LoadConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.table_name, "sales");
    assert_eq!(back.if_exists, IfExists::Replace);
    assert_eq!(back.primary_key, config.primary_key);
}

#[test]
fn test_summary_serializes_for_reporting() {
    let mut session = MemorySession::new();
    let mut config = LoadConfig::new("sales");
    config.auto_create = true;

    let outcome = LoadOrchestrator::new(&mut session)
        .load(&sales_dataset(), &config)
        .unwrap();

    let json = serde_json::to_value(outcome.summary().unwrap()).unwrap();
    assert_eq!(json["table"], "public.sales");
    assert_eq!(json["rows_inserted"], 3);
}

// With the postgres backend compiled in, the preferred connector would try a
// real network connection.
#[cfg(not(feature = "postgres-backend"))]
#[test]
fn test_loader_over_registry_round_trip() {
    let registry = ConnectorRegistry::probe();
    let params = ConnectionParams {
        host: "localhost".to_string(),
        port: 5439,
        database: "dev".to_string(),
        user: "loader".to_string(),
        password: "secret".to_string(),
    };
    let loader = Loader::new(&registry, params);

    let mut config = LoadConfig::new("sales");
    config.auto_create = true;

    let outcome = loader.load(&sales_dataset(), &config).unwrap();
    assert_eq!(outcome.summary().unwrap().rows_inserted, 3);
}
