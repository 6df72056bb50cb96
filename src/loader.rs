//! Load orchestration
//!
//! Sequences sanitization, inference, key validation, SQL generation and
//! chunked insertion over a warehouse [`Session`]. All validation happens
//! before any statement executes; execution failures roll back the in-flight
//! transaction and surface wrapped with load context.
//!
//! The orchestrator is single-threaded and synchronous. Chunk insertion is
//! strictly sequential in original row order; the warehouse's physical row
//! clustering depends on insertion order matching the dataset's order.

use crate::chunk::{Chunk, ChunkPlan};
use crate::connector::{ConnectionParams, ConnectorRegistry, Session};
use crate::dataset::{ColumnDomain, Dataset, TableTarget, Value};
use crate::error::{LoadError, LoadResult};
use crate::inference::infer_types;
use crate::keys::{self, DistSpec, DistStyle, KeySpec};
use crate::sanitize::{clean_identifier, rename_reserved_columns};
use crate::sql::{DdlGenerator, DmlGenerator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default target schema
pub const DEFAULT_SCHEMA: &str = "public";

/// Default chunk budget in megabytes
pub const DEFAULT_CHUNK_SIZE_MB: usize = 15;

/// Behavior when the target table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Let the warehouse reject the create (default)
    #[default]
    Fail,
    /// Drop and recreate the target
    Replace,
    /// Keep the target and append rows
    Append,
}

impl std::str::FromStr for IfExists {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            _ => Err(format!("unknown if_exists mode: {s}")),
        }
    }
}

/// Load configuration for one call.
///
/// Every field has the documented default; construct with
/// [`LoadConfig::new`] and adjust fields as needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Target table name (required unless `destination` is set)
    pub table_name: String,
    /// Target schema
    pub schema: String,
    /// Behavior when the target exists
    pub if_exists: IfExists,
    /// Chunk byte budget in megabytes
    pub chunk_size_mb: usize,
    /// Create the target table before inserting
    pub auto_create: bool,
    /// Explicit column type overrides, merged over inferred types
    pub column_types: BTreeMap<String, String>,
    /// Primary key specification
    pub primary_key: KeySpec,
    /// Rename reserved-word columns instead of failing
    pub fix_reserved_words: bool,
    /// `schema.table` override; wins over `schema` + `table_name`
    pub destination: Option<String>,
    /// Physical sort precedence
    pub sortkey: Vec<String>,
    /// Distribution style
    pub diststyle: Option<DistStyle>,
    /// Distribution key column; implies `diststyle: key` when set alone
    pub distkey: Option<String>,
    /// Validate DDL against a disposable table and report, loading nothing
    pub test_only: bool,
    /// Time the first chunk and extrapolate, loading nothing
    pub estimate_only: bool,
    /// Reject text values the warehouse transfer would refuse
    pub validate_encoding: bool,
    /// Column name -> compression encoding
    pub compress_columns: BTreeMap<String, String>,
    /// Back up the existing target before replacing it
    pub backup: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            schema: DEFAULT_SCHEMA.to_string(),
            if_exists: IfExists::Fail,
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            auto_create: true,
            column_types: BTreeMap::new(),
            primary_key: KeySpec::None,
            fix_reserved_words: true,
            destination: None,
            sortkey: Vec::new(),
            diststyle: None,
            distkey: None,
            test_only: false,
            estimate_only: false,
            validate_encoding: true,
            compress_columns: BTreeMap::new(),
            backup: true,
        }
    }
}

impl LoadConfig {
    /// Config with defaults for the given table name
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// Status of a test or estimate run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Success,
    Failed,
    Empty,
    /// A completed estimate; callers see `"estimated"` on the wire
    Estimated,
}

/// Result of a successful normal load
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    /// Qualified target table
    pub table: String,
    /// Total rows inserted
    pub rows_inserted: usize,
    /// Renames applied to reserved-word columns (old -> new)
    pub column_mapping: BTreeMap<String, String>,
    /// Number of chunks inserted
    pub chunks_processed: usize,
    /// Total elapsed seconds
    pub total_time: f64,
}

/// Result of a test-only run
#[derive(Debug, Clone, Serialize)]
pub struct DdlTestResult {
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an estimate-only run
#[derive(Debug, Clone, Serialize)]
pub struct EstimateResult {
    pub status: LoadStatus,
    /// Seconds taken to insert the first chunk
    pub first_chunk_time: f64,
    /// Number of chunks a full load would process
    pub total_chunks: usize,
    /// Linear extrapolation: `first_chunk_time * total_chunks`
    pub estimated_total_time: f64,
    /// Chunk budget the estimate ran with
    pub chunk_size_mb: usize,
    /// Total dataset rows
    pub total_rows: usize,
    /// Rows in the timed chunk
    pub first_chunk_rows: usize,
}

impl EstimateResult {
    fn empty(chunk_size_mb: usize) -> Self {
        Self {
            status: LoadStatus::Empty,
            first_chunk_time: 0.0,
            total_chunks: 0,
            estimated_total_time: 0.0,
            chunk_size_mb,
            total_rows: 0,
            first_chunk_rows: 0,
        }
    }
}

/// Outcome of a load call, by mode
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded(LoadSummary),
    DdlTest(DdlTestResult),
    Estimate(EstimateResult),
}

impl LoadOutcome {
    /// The load summary, if this was a normal load
    pub fn summary(&self) -> Option<&LoadSummary> {
        match self {
            LoadOutcome::Loaded(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Everything derived during validation, handed to the execution branches
struct ResolvedLoad {
    target: TableTarget,
    dataset: Dataset,
    column_order: Vec<String>,
    domains: Vec<ColumnDomain>,
    types: BTreeMap<String, String>,
    primary_key: Vec<String>,
    sortkey: Vec<String>,
    dist: Option<DistSpec>,
    compression: BTreeMap<String, String>,
    rename_map: BTreeMap<String, String>,
}

/// Drives one load call over an exclusively-owned session
pub struct LoadOrchestrator<'a> {
    session: &'a mut dyn Session,
}

impl<'a> LoadOrchestrator<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self { session }
    }

    /// Run one load call: validate everything, then branch on mode.
    ///
    /// Validation (target resolution, encoding, sanitization, key/sort/dist
    /// checks, type inference) completes before any statement reaches the
    /// warehouse; a validation failure has zero side effects.
    pub fn load(&mut self, dataset: &Dataset, config: &LoadConfig) -> LoadResult<LoadOutcome> {
        let resolved = resolve(dataset, config)?;
        info!(
            table = %resolved.target.qualified(),
            rows = resolved.dataset.rows(),
            columns = resolved.column_order.len(),
            "load validated"
        );

        if config.test_only {
            return Ok(LoadOutcome::DdlTest(self.run_ddl_test(&resolved)));
        }
        if config.estimate_only {
            return self.run_estimate(&resolved, config).map(LoadOutcome::Estimate);
        }
        self.run_load(&resolved, config).map(LoadOutcome::Loaded)
    }

    /// Execute the generated DDL against a disposable temporary table and
    /// report the outcome. Execution failures are caught into the result,
    /// never raised.
    fn run_ddl_test(&mut self, resolved: &ResolvedLoad) -> DdlTestResult {
        let test_target = TableTarget {
            schema: resolved.target.schema.clone(),
            table: format!("{}_ddl_test", resolved.target.table),
        };
        let ddl = ddl_for(resolved, &test_target, true, false);

        match self.session.execute(&ddl) {
            Ok(_) => {
                let _ = self.session.execute(&format!("DROP TABLE {}", test_target.table));
                let _ = self.session.rollback();
                info!(table = %resolved.target.qualified(), "DDL test passed");
                DdlTestResult {
                    status: LoadStatus::Success,
                    message: Some(format!(
                        "DDL for {} validated against a temporary table",
                        resolved.target.qualified()
                    )),
                    error: None,
                }
            }
            Err(e) => {
                let _ = self.session.rollback();
                info!(table = %resolved.target.qualified(), error = %e, "DDL test failed");
                DdlTestResult {
                    status: LoadStatus::Failed,
                    message: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Time a single first-chunk insert into a temporary table and linearly
    /// extrapolate over the full chunk count.
    fn run_estimate(
        &mut self,
        resolved: &ResolvedLoad,
        config: &LoadConfig,
    ) -> LoadResult<EstimateResult> {
        if resolved.dataset.is_empty() {
            debug!("estimate on empty dataset short-circuits");
            return Ok(EstimateResult::empty(config.chunk_size_mb));
        }

        let mut plan = ChunkPlan::new(&resolved.dataset, config.chunk_size_mb);
        let total_chunks = plan.total_chunks();
        let Some(first) = plan.next() else {
            return Ok(EstimateResult::empty(config.chunk_size_mb));
        };

        let estimate_target = TableTarget {
            schema: resolved.target.schema.clone(),
            table: format!("{}_estimate", resolved.target.table),
        };
        let ddl = ddl_for(resolved, &estimate_target, true, false);
        self.execute_ddl(&ddl, &resolved.target, "estimate")?;

        let insert = DmlGenerator::insert_template(&estimate_target.table, &resolved.column_order);
        let rows = collect_rows(&resolved.dataset, &first);

        let started = Instant::now();
        self.execute_dml(&insert, &resolved.domains, &rows, &resolved.target, "estimate")?;
        let first_chunk_time = started.elapsed().as_secs_f64();

        let _ = self
            .session
            .execute(&format!("DROP TABLE {}", estimate_target.table));
        let _ = self.session.rollback();

        info!(
            table = %resolved.target.qualified(),
            first_chunk_time,
            total_chunks,
            "estimate complete"
        );
        Ok(EstimateResult {
            status: LoadStatus::Estimated,
            first_chunk_time,
            total_chunks,
            estimated_total_time: first_chunk_time * total_chunks as f64,
            chunk_size_mb: config.chunk_size_mb,
            total_rows: resolved.dataset.rows(),
            first_chunk_rows: first.rows(),
        })
    }

    /// Normal load: backup/replace, optional create, sequential ordered chunk
    /// inserts, single commit.
    fn run_load(
        &mut self,
        resolved: &ResolvedLoad,
        config: &LoadConfig,
    ) -> LoadResult<LoadSummary> {
        let load_started = Instant::now();
        let replacing = config.if_exists == IfExists::Replace;

        if replacing && config.backup {
            self.backup_existing(&resolved.target)?;
        }

        if config.auto_create || replacing {
            if replacing {
                self.execute_ddl(
                    &format!("DROP TABLE IF EXISTS {}", resolved.target.qualified()),
                    &resolved.target,
                    "create table",
                )?;
            }
            let ddl = ddl_for(
                resolved,
                &resolved.target,
                false,
                config.if_exists == IfExists::Append,
            );
            self.execute_ddl(&ddl, &resolved.target, "create table")?;
            info!(table = %resolved.target.qualified(), "target table created");
        }

        let insert =
            DmlGenerator::insert_template(&resolved.target.qualified(), &resolved.column_order);
        let plan = ChunkPlan::new(&resolved.dataset, config.chunk_size_mb);
        let total_chunks = plan.total_chunks();

        let mut rows_inserted = 0;
        let mut chunks_processed = 0;
        for chunk in plan {
            let rows = collect_rows(&resolved.dataset, &chunk);
            let chunk_started = Instant::now();
            self.execute_dml(&insert, &resolved.domains, &rows, &resolved.target, "insert")?;
            chunks_processed += 1;
            rows_inserted += rows.len();
            debug!(
                chunk = chunks_processed,
                of = total_chunks,
                rows = rows.len(),
                elapsed = chunk_started.elapsed().as_secs_f64(),
                "chunk inserted"
            );
        }

        self.session.commit().map_err(|source| {
            let _ = self.session.rollback();
            LoadError::DmlExecution {
                table: resolved.target.qualified(),
                phase: "commit",
                source,
            }
        })?;

        let total_time = load_started.elapsed().as_secs_f64();
        info!(
            table = %resolved.target.qualified(),
            rows_inserted,
            chunks_processed,
            total_time,
            "load committed"
        );
        Ok(LoadSummary {
            table: resolved.target.qualified(),
            rows_inserted,
            column_mapping: resolved.rename_map.clone(),
            chunks_processed,
            total_time,
        })
    }

    /// Best-effort full copy of the existing target, committed as its own
    /// unit so later failures in this load cannot roll it back. A missing
    /// target is expected and benign.
    fn backup_existing(&mut self, target: &TableTarget) -> LoadResult<()> {
        let backup = TableTarget {
            schema: target.schema.clone(),
            table: format!("{}_backup", target.table),
        };
        self.execute_ddl(
            &format!("DROP TABLE IF EXISTS {}", backup.qualified()),
            target,
            "backup",
        )?;

        let copy = format!(
            "CREATE TABLE {} AS SELECT * FROM {}",
            backup.qualified(),
            target.qualified()
        );
        match self.session.execute(&copy) {
            Ok(_) => {
                self.session.commit().map_err(|source| LoadError::DdlExecution {
                    table: target.qualified(),
                    phase: "backup",
                    source,
                })?;
                info!(backup = %backup.qualified(), "backup table created");
                Ok(())
            }
            Err(source) => {
                let message = source.to_string().to_lowercase();
                let _ = self.session.rollback();
                if message.contains("does not exist") || message.contains("not found") {
                    warn!(table = %target.qualified(), "no existing target to back up");
                    Ok(())
                } else {
                    Err(LoadError::DdlExecution {
                        table: target.qualified(),
                        phase: "backup",
                        source,
                    })
                }
            }
        }
    }

    fn execute_ddl(
        &mut self,
        sql: &str,
        target: &TableTarget,
        phase: &'static str,
    ) -> LoadResult<u64> {
        self.session.execute(sql).map_err(|source| {
            let _ = self.session.rollback();
            LoadError::DdlExecution {
                table: target.qualified(),
                phase,
                source,
            }
        })
    }

    fn execute_dml(
        &mut self,
        sql: &str,
        domains: &[ColumnDomain],
        rows: &[Vec<Value>],
        target: &TableTarget,
        phase: &'static str,
    ) -> LoadResult<u64> {
        self.session.execute_batch(sql, domains, rows).map_err(|source| {
            let _ = self.session.rollback();
            LoadError::DmlExecution {
                table: target.qualified(),
                phase,
                source,
            }
        })
    }
}

/// Convenience wrapper tying a registry and connection parameters to load
/// calls. Opens a fresh session per call and releases it on every exit path.
pub struct Loader<'r> {
    registry: &'r ConnectorRegistry,
    params: ConnectionParams,
}

impl<'r> Loader<'r> {
    pub fn new(registry: &'r ConnectorRegistry, params: ConnectionParams) -> Self {
        Self { registry, params }
    }

    /// Open a session with the preferred connector, run one load call, and
    /// close the session whatever the outcome.
    pub fn load(&self, dataset: &Dataset, config: &LoadConfig) -> LoadResult<LoadOutcome> {
        let connector = self.registry.preferred();
        let mut session = connector
            .connect(&self.params)
            .map_err(|e| LoadError::Connection(e.to_string()))?;

        let outcome = LoadOrchestrator::new(session.as_mut()).load(dataset, config);
        let _ = session.close();
        outcome
    }
}

/// Run the whole validation pipeline, producing everything the execution
/// branches need. No warehouse statements are issued here.
fn resolve(dataset: &Dataset, config: &LoadConfig) -> LoadResult<ResolvedLoad> {
    let target = resolve_target(config)?;

    if config.validate_encoding {
        validate_encoding(dataset)?;
    }

    let (working, rename_map) = rename_reserved_columns(dataset, config.fix_reserved_words)?;

    // The rename map applies to every spec that names columns.
    let key_spec = rename_key_spec(&config.primary_key, &rename_map);
    let sortkey = rename_all(&config.sortkey, &rename_map);
    let distkey = config.distkey.as_ref().map(|k| renamed(k, &rename_map));
    let type_overrides = rename_keys(&config.column_types, &rename_map);
    let compression = rename_keys(&config.compress_columns, &rename_map);

    let resolved_key = keys::resolve_key(&key_spec, &working)?;
    let working = resolved_key.dataset.unwrap_or(working);

    let mut types = infer_types(&working);
    for (column, override_type) in &type_overrides {
        if !working.has_column(column) {
            return Err(LoadError::DataValidation(format!(
                "column type override references unknown column '{column}'"
            )));
        }
        types.insert(column.clone(), override_type.clone());
    }
    for column in compression.keys() {
        if !working.has_column(column) {
            return Err(LoadError::DataValidation(format!(
                "compression entry references unknown column '{column}'"
            )));
        }
    }

    keys::validate_sort_spec(&sortkey, &working)?;
    let dist = resolve_dist_spec(config.diststyle, distkey);
    if let Some(spec) = &dist {
        keys::validate_dist_spec(spec, &working)?;
    }

    let column_order = working.column_names();
    let domains = working.columns().iter().map(|c| c.domain).collect();
    Ok(ResolvedLoad {
        target,
        dataset: working,
        column_order,
        domains,
        types,
        primary_key: resolved_key.columns,
        sortkey,
        dist,
        compression,
        rename_map,
    })
}

/// Resolve and sanitize the destination. An explicit `destination` override
/// wins over `schema` + `table_name`.
fn resolve_target(config: &LoadConfig) -> LoadResult<TableTarget> {
    if let Some(destination) = &config.destination {
        // a destination without a dot is a bare table name in the configured
        // schema
        return match destination.split_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => Ok(TableTarget {
                schema: clean_identifier(schema),
                table: clean_identifier(table),
            }),
            Some(_) => Err(LoadError::DataValidation(format!(
                "destination '{destination}' must be 'schema.table' or a table name"
            ))),
            None if destination.is_empty() => Err(LoadError::DataValidation(
                "destination must not be empty".to_string(),
            )),
            None => Ok(TableTarget {
                schema: clean_identifier(&config.schema),
                table: clean_identifier(destination),
            }),
        };
    }

    if config.table_name.is_empty() {
        return Err(LoadError::DataValidation(
            "table_name is required when no destination is set".to_string(),
        ));
    }
    Ok(TableTarget {
        schema: clean_identifier(&config.schema),
        table: clean_identifier(&config.table_name),
    })
}

/// Text values reach the warehouse over the postgres wire text transfer,
/// which rejects interior NUL bytes; everything else a Rust `String` can hold
/// is valid UTF-8 by construction.
fn validate_encoding(dataset: &Dataset) -> LoadResult<()> {
    for column in dataset.columns() {
        for (row, value) in column.values.iter().enumerate() {
            if let Value::Text(text) = value {
                if text.contains('\0') {
                    return Err(LoadError::DataValidation(format!(
                        "column '{}' row {row} contains a NUL byte",
                        column.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn resolve_dist_spec(style: Option<DistStyle>, key_column: Option<String>) -> Option<DistSpec> {
    match (style, key_column) {
        (None, None) => None,
        // a bare distkey implies key distribution
        (None, Some(key)) => Some(DistSpec {
            style: DistStyle::Key,
            key_column: Some(key),
        }),
        (Some(style), key_column) => Some(DistSpec { style, key_column }),
    }
}

fn renamed(name: &str, rename_map: &BTreeMap<String, String>) -> String {
    rename_map.get(name).cloned().unwrap_or_else(|| name.to_string())
}

fn rename_all(names: &[String], rename_map: &BTreeMap<String, String>) -> Vec<String> {
    names.iter().map(|n| renamed(n, rename_map)).collect()
}

fn rename_keys(
    map: &BTreeMap<String, String>,
    rename_map: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| (renamed(k, rename_map), v.clone()))
        .collect()
}

fn rename_key_spec(spec: &KeySpec, rename_map: &BTreeMap<String, String>) -> KeySpec {
    match spec {
        KeySpec::None => KeySpec::None,
        KeySpec::Single(name) => KeySpec::Single(renamed(name, rename_map)),
        KeySpec::Composite(names) => KeySpec::Composite(rename_all(names, rename_map)),
        KeySpec::AutoFromIndex => KeySpec::AutoFromIndex,
    }
}

fn ddl_for(
    resolved: &ResolvedLoad,
    target: &TableTarget,
    temporary: bool,
    if_not_exists: bool,
) -> String {
    DdlGenerator {
        target,
        columns: &resolved.column_order,
        types: &resolved.types,
        primary_key: &resolved.primary_key,
        sortkey: &resolved.sortkey,
        dist: resolved.dist.as_ref(),
        compression: &resolved.compression,
        temporary,
        if_not_exists,
    }
    .sql()
}

/// Materialize a chunk's rows in column order
fn collect_rows(dataset: &Dataset, chunk: &Chunk) -> Vec<Vec<Value>> {
    (chunk.start..chunk.end).map(|row| dataset.row(row)).collect()
}
