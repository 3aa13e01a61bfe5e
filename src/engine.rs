//! Database, connection and prepared statement wrappers over DuckDB
//!
//! These types are the native side of every handle. They never see raw
//! pointers or foreign strings: the registry and the boundary adapters
//! deal with those.
//!
//! Lifetime model: a [`Database`] owns the root engine connection. Every
//! [`Connection`] and [`PreparedStatement`] derived from it keeps a shared
//! reference to that root, so the engine instance is only shut down once
//! nothing can still reach it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use duckdb::{params_from_iter, AccessMode, Config};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::bindings::BindingStore;
use crate::error::{BridgeError, Result};
use crate::serializer::{serialize_chunks, MaterializedResult};

/// Path marker for an in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// Extension checked by [`Database::has_spatial`]
pub const SPATIAL_EXTENSION: &str = "spatial";

/// Parquet compression codecs accepted by [`Connection::export_parquet`]
pub const PARQUET_COMPRESSIONS: &[&str] = &["snappy", "gzip", "zstd", "lz4", "brotli", "uncompressed"];

/// Applied to every session: 128-bit integers, UUID and other engine
/// types reach Arrow as tagged extension columns instead of lossy casts
const SESSION_SETTINGS: &str = "SET arrow_lossless_conversion = true";

type SharedConnection = Arc<Mutex<duckdb::Connection>>;

/// Lock a mutex, recovering the guard if a previous holder panicked
///
/// Every engine call is a single statement against DuckDB, which keeps its
/// own state consistent, so a poisoned guard is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Options applied when a database is opened
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenOptions {
    /// Permit loading extensions without a valid signature
    pub allow_unsigned_extensions: bool,
    /// Let the engine load known extensions on first use
    pub autoload_extensions: bool,
    /// Extensions loaded (best effort) right after opening
    pub extensions: Vec<String>,
    /// Engine worker thread count
    pub threads: Option<u32>,
    /// Open the database file read-only
    pub read_only: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            allow_unsigned_extensions: true,
            autoload_extensions: false,
            extensions: vec![SPATIAL_EXTENSION.to_string()],
            threads: None,
            read_only: false,
        }
    }
}

impl OpenOptions {
    /// Parse options from a JSON object; an empty string means defaults
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let options: Self =
            serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Options that load no extensions
    pub fn without_extensions() -> Self {
        Self {
            extensions: Vec::new(),
            ..Self::default()
        }
    }

    /// Check values the engine would otherwise receive unchecked
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.extensions.iter().find(|name| !is_identifier(name)) {
            return Err(BridgeError::Config(format!(
                "extension name '{}' is not a plain identifier",
                name
            )));
        }
        if self.threads == Some(0) {
            return Err(BridgeError::Config("threads must be at least 1".into()));
        }
        Ok(())
    }

    fn engine_config(&self) -> Result<Config> {
        let mut config = Config::default().enable_autoload_extension(self.autoload_extensions)?;
        if self.allow_unsigned_extensions {
            config = config.allow_unsigned_extensions()?;
        }
        if let Some(threads) = self.threads {
            config = config.threads(i64::from(threads))?;
        }
        if self.read_only {
            config = config.access_mode(AccessMode::ReadOnly)?;
        }
        Ok(config)
    }
}

/// Reject SQL that would reach the engine with no statement in it
fn non_empty(sql: &str) -> Result<&str> {
    if sql.trim().is_empty() {
        return Err(BridgeError::EmptySql);
    }
    Ok(sql)
}

/// Best effort: an engine without the setting still serves queries
fn configure_session(conn: &duckdb::Connection) {
    if let Err(e) = conn.execute_batch(SESSION_SETTINGS) {
        warn!(error = %e, "lossless arrow export unavailable");
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// True for the markers that select an in-memory database
pub fn is_memory_path(path: Option<&str>) -> bool {
    matches!(path, None | Some("") | Some(MEMORY_PATH))
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Version string of the linked engine library
pub fn engine_version() -> &'static str {
    // SAFETY: the engine returns a pointer to a static NUL-terminated string
    let raw = unsafe { duckdb::ffi::duckdb_library_version() };
    if raw.is_null() {
        return "unknown";
    }
    unsafe { std::ffi::CStr::from_ptr(raw) }
        .to_str()
        .unwrap_or("unknown")
}

/// An open engine instance
pub struct Database {
    root: SharedConnection,
    path: Option<PathBuf>,
    loaded_extensions: Vec<String>,
}

impl Database {
    /// Open a database file, or an in-memory database for `None`, `""`
    /// and `":memory:"`
    ///
    /// Extension loading is best effort: failures are logged and the open
    /// still succeeds.
    #[instrument(skip(options))]
    pub fn open(path: Option<&str>, options: &OpenOptions) -> Result<Self> {
        options.validate()?;
        let config = options.engine_config()?;

        let (conn, path) = if is_memory_path(path) {
            (duckdb::Connection::open_in_memory_with_flags(config)?, None)
        } else {
            let path = PathBuf::from(path.unwrap_or_default());
            (duckdb::Connection::open_with_flags(&path, config)?, Some(path))
        };
        configure_session(&conn);

        let mut loaded_extensions = Vec::new();
        for name in &options.extensions {
            match conn.execute_batch(&format!("LOAD {}", name)) {
                Ok(()) => {
                    info!(extension = %name, "extension loaded");
                    loaded_extensions.push(name.clone());
                }
                Err(e) => warn!(extension = %name, error = %e, "extension failed to load"),
            }
        }

        let label = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| MEMORY_PATH.to_string());
        info!(path = %label, extensions = loaded_extensions.len(), "database opened");

        Ok(Self {
            root: Arc::new(Mutex::new(conn)),
            path,
            loaded_extensions,
        })
    }

    /// Open an in-memory database with no extensions
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None, &OpenOptions::without_extensions())
    }

    /// File backing this database, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether `name` was loaded when the database was opened
    pub fn has_extension(&self, name: &str) -> bool {
        self.loaded_extensions.iter().any(|loaded| loaded == name)
    }

    /// Whether the spatial extension is available
    pub fn has_spatial(&self) -> bool {
        self.has_extension(SPATIAL_EXTENSION)
    }

    /// Extensions loaded at open time
    pub fn loaded_extensions(&self) -> &[String] {
        &self.loaded_extensions
    }

    /// Open a new session against this database
    pub fn connect(&self) -> Result<Connection> {
        let conn = lock(&self.root).try_clone()?;
        configure_session(&conn);
        debug!("session created");
        Ok(Connection {
            conn: Arc::new(Mutex::new(conn)),
            root: Arc::clone(&self.root),
        })
    }
}

/// A session against a [`Database`]
///
/// Session state (transactions, temporary tables, settings) is shared with
/// every statement prepared on it.
pub struct Connection {
    conn: SharedConnection,
    root: SharedConnection,
}

impl Connection {
    /// Run `sql` and fetch the whole result
    #[instrument(skip(self))]
    pub fn query_result(&self, sql: &str) -> Result<MaterializedResult> {
        let sql = non_empty(sql)?;
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(sql)?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();
        let result = MaterializedResult::new(schema, arrow);
        debug!(rows = result.row_count(), columns = result.column_count(), "query fetched");
        Ok(result)
    }

    /// Run `sql` and serialize its rows
    pub fn query(&self, sql: &str) -> Result<String> {
        Ok(self.query_result(sql)?.serialize())
    }

    /// Run `sql` with positional parameters and serialize its rows
    #[instrument(skip(self, bindings), fields(params = bindings.len()))]
    pub fn query_with_params(&self, sql: &str, bindings: &BindingStore) -> Result<String> {
        let sql = non_empty(sql)?;
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(sql)?;
        let arrow = stmt.query_arrow(params_from_iter(bindings.values()))?;
        let schema = arrow.get_schema();
        Ok(serialize_chunks(&schema, arrow))
    }

    /// Run a single statement and report the number of rows it changed
    #[instrument(skip(self))]
    pub fn execute(&self, sql: &str) -> Result<usize> {
        let changes = lock(&self.conn).execute(non_empty(sql)?, [])?;
        debug!(changes, "statement executed");
        Ok(changes)
    }

    /// Run a single statement with positional parameters
    #[instrument(skip(self, bindings), fields(params = bindings.len()))]
    pub fn run(&self, sql: &str, bindings: &BindingStore) -> Result<usize> {
        let sql = non_empty(sql)?;
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(sql)?;
        let changes = stmt.execute(params_from_iter(bindings.values()))?;
        debug!(changes, "statement executed");
        Ok(changes)
    }

    /// Run a script of one or more statements, discarding results
    #[instrument(skip(self))]
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        lock(&self.conn).execute_batch(non_empty(sql)?)?;
        Ok(())
    }

    /// Compile `sql` into a reusable statement
    ///
    /// The binding store starts with one null slot per declared parameter.
    #[instrument(skip(self))]
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let sql = non_empty(sql)?;
        let parameter_count = {
            let conn = lock(&self.conn);
            let stmt = conn.prepare_cached(sql)?;
            stmt.parameter_count()
        };
        info!(parameter_count, "statement prepared");
        Ok(PreparedStatement {
            conn: Arc::clone(&self.conn),
            _root: Arc::clone(&self.root),
            sql: sql.to_string(),
            parameter_count,
            bindings: BindingStore::with_len(parameter_count),
        })
    }

    /// Names of the tables visible to this session, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare("SELECT table_name FROM duckdb_tables() ORDER BY table_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Whether a table named `table` exists
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = lock(&self.conn);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM duckdb_tables() WHERE table_name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Write `table` to a Parquet file and return its row count
    ///
    /// `compression` defaults to snappy and is matched case-insensitively.
    #[instrument(skip(self))]
    pub fn export_parquet(&self, table: &str, dest: &Path, compression: Option<&str>) -> Result<u64> {
        let compression = match compression.map(str::trim).filter(|c| !c.is_empty()) {
            None => "snappy".to_string(),
            Some(c) => {
                let c = c.to_ascii_lowercase();
                if !PARQUET_COMPRESSIONS.contains(&c.as_str()) {
                    return Err(BridgeError::Params(format!(
                        "unsupported parquet compression '{}'",
                        c
                    )));
                }
                c
            }
        };

        if !self.table_exists(table)? {
            return Err(BridgeError::TableNotFound(table.to_string()));
        }

        let quoted = quote_identifier(table);
        let conn = lock(&self.conn);
        let rows: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| {
            row.get(0)
        })?;
        conn.execute_batch(&format!(
            "COPY {} TO {} (FORMAT PARQUET, COMPRESSION '{}')",
            quoted,
            quote_literal(&dest.to_string_lossy()),
            compression
        ))?;

        info!(table, rows, dest = %dest.display(), "table exported");
        Ok(rows.max(0) as u64)
    }
}

/// A compiled statement with its parameter bindings
#[derive(Debug)]
pub struct PreparedStatement {
    conn: SharedConnection,
    _root: SharedConnection,
    sql: String,
    parameter_count: usize,
    bindings: BindingStore,
}

impl PreparedStatement {
    /// Statement text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of parameters the engine declared at prepare time
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Current parameter values
    pub fn bindings(&self) -> &BindingStore {
        &self.bindings
    }

    /// Mutable access for binding and clearing
    pub fn bindings_mut(&mut self) -> &mut BindingStore {
        &mut self.bindings
    }

    /// Execute with the current bindings and serialize the rows
    ///
    /// The bindings are passed as a whole, gaps included, and left as they
    /// are, so the statement can be re-run or re-bound.
    pub fn execute(&self) -> Result<String> {
        debug!(params = self.bindings.len(), "executing prepared statement");
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare_cached(&self.sql)?;
        let arrow = stmt.query_arrow(params_from_iter(self.bindings.values()))?;
        let schema = arrow.get_schema();
        Ok(serialize_chunks(&schema, arrow))
    }

    /// Execute with the current bindings and report the rows changed
    pub fn run(&self) -> Result<usize> {
        debug!(params = self.bindings.len(), "running prepared statement");
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare_cached(&self.sql)?;
        Ok(stmt.execute(params_from_iter(self.bindings.values()))?)
    }
}
