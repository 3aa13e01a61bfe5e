//! Name-keyed database management
//!
//! Hosts usually address databases by a short name ("notes", "cache.db")
//! rather than by path. A [`DatabaseManager`] maps names to files under one
//! root directory and keeps one open database plus one session per name.
//!
//! Name resolution:
//!
//! - `""` and `":memory:"` select an in-memory database
//! - names ending in `.duckdb` or `.db` are used as file names as-is
//! - anything else gets a `.duckdb` suffix

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bindings::BindingStore;
use crate::engine::{is_memory_path, Connection, Database, OpenOptions};
use crate::error::{BridgeError, Result};

/// Default file suffix for named databases
pub const DATABASE_SUFFIX: &str = ".duckdb";

/// Outcome of a Parquet export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParquetExport {
    /// Written file
    pub path: PathBuf,
    /// Rows in the exported table
    pub row_count: u64,
}

/// Parquet file for `table` at `dest`
///
/// An existing directory gets a `<table>_<unix millis>.parquet` file inside
/// it; any other path is used as given.
pub fn export_path(dest: &Path, table: &str) -> PathBuf {
    if !dest.is_dir() {
        return dest.to_path_buf();
    }
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    dest.join(format!("{}_{}.parquet", table, millis))
}

struct OpenDatabase {
    session: Connection,
    database: Database,
}

/// Named databases under a root directory
pub struct DatabaseManager {
    root: PathBuf,
    options: OpenOptions,
    open: FxHashMap<String, OpenDatabase>,
}

impl DatabaseManager {
    /// Manager for databases stored under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, OpenOptions::default())
    }

    /// Manager applying `options` to every database it opens
    pub fn with_options(root: impl Into<PathBuf>, options: OpenOptions) -> Self {
        Self {
            root: root.into(),
            options,
            open: FxHashMap::default(),
        }
    }

    /// Directory holding the database files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a name maps to; `None` for in-memory names
    pub fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        if is_memory_path(Some(name)) {
            return None;
        }
        let file_name = if name.ends_with(DATABASE_SUFFIX) || name.ends_with(".db") {
            name.to_string()
        } else {
            format!("{}{}", name, DATABASE_SUFFIX)
        };
        Some(self.root.join(file_name))
    }

    /// Open `name` and a session on it; opening an open name is a no-op
    pub fn open(&mut self, name: &str) -> Result<()> {
        if self.open.contains_key(name) {
            debug!(name, "database already open");
            return Ok(());
        }

        let path = self.resolve_path(name);
        if path.is_some() {
            std::fs::create_dir_all(&self.root)?;
        }
        let path_str = path.as_ref().map(|p| p.to_string_lossy().into_owned());
        let database = Database::open(path_str.as_deref(), &self.options)?;
        let session = database.connect()?;

        self.open.insert(name.to_string(), OpenDatabase { session, database });
        info!(name, "named database opened");
        Ok(())
    }

    /// Close `name`
    pub fn close(&mut self, name: &str) -> Result<()> {
        match self.open.remove(name) {
            Some(_) => {
                info!(name, "named database closed");
                Ok(())
            }
            None => Err(BridgeError::NotOpen(name.to_string())),
        }
    }

    /// Close every open database
    pub fn close_all(&mut self) {
        let count = self.open.len();
        self.open.clear();
        if count > 0 {
            info!(count, "closed all named databases");
        }
    }

    /// Whether `name` is open
    pub fn is_open(&self, name: &str) -> bool {
        self.open.contains_key(name)
    }

    /// Names of open databases, sorted
    pub fn open_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.open.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn entry(&self, name: &str) -> Result<&OpenDatabase> {
        self.open
            .get(name)
            .ok_or_else(|| BridgeError::NotOpen(name.to_string()))
    }

    fn session(&self, name: &str) -> Result<&Connection> {
        self.entry(name).map(|entry| &entry.session)
    }

    /// Whether `extension` was loaded when `name` was opened
    pub fn has_extension(&self, name: &str, extension: &str) -> Result<bool> {
        Ok(self.entry(name)?.database.has_extension(extension))
    }

    /// Serialized rows of `sql`
    pub fn query(&self, name: &str, sql: &str) -> Result<String> {
        self.session(name)?.query(sql)
    }

    /// Rows changed by a single statement
    pub fn execute(&self, name: &str, sql: &str) -> Result<u64> {
        Ok(self.session(name)?.execute(sql)? as u64)
    }

    /// Run a multi-statement script
    pub fn execute_batch(&self, name: &str, sql: &str) -> Result<()> {
        self.session(name)?.execute_batch(sql)
    }

    /// Serialized rows of `sql` with a JSON array of positional parameters
    pub fn query_with_params(&self, name: &str, sql: &str, params_json: &str) -> Result<String> {
        let session = self.session(name)?;
        let mut params = BindingStore::new();
        params.bind_json(params_json)?;
        session.query_with_params(sql, &params)
    }

    /// Rows changed by `sql` with a JSON array of positional parameters
    pub fn run(&self, name: &str, sql: &str, params_json: &str) -> Result<u64> {
        let session = self.session(name)?;
        let mut params = BindingStore::new();
        params.bind_json(params_json)?;
        Ok(session.run(sql, &params)? as u64)
    }

    /// Tables of `name`, sorted
    pub fn list_tables(&self, name: &str) -> Result<Vec<String>> {
        self.session(name)?.list_tables()
    }

    /// Export `table` to Parquet at [`export_path`]
    pub fn export_parquet(
        &self,
        name: &str,
        table: &str,
        dest: &Path,
        compression: Option<&str>,
    ) -> Result<ParquetExport> {
        let session = self.session(name)?;
        let path = export_path(dest, table);
        let row_count = session.export_parquet(table, &path, compression)?;
        Ok(ParquetExport { path, row_count })
    }

    /// Close `name` if open and delete its file (and write-ahead log)
    ///
    /// A missing file is not an error.
    pub fn delete_database(&mut self, name: &str) -> Result<()> {
        if self.is_open(name) {
            self.close(name)?;
        }
        let path = self
            .resolve_path(name)
            .ok_or_else(|| BridgeError::Io("cannot delete an in-memory database".into()))?;

        if path.exists() {
            std::fs::remove_file(&path)?;
            info!(name, path = %path.display(), "database deleted");
        }
        let mut wal = path.into_os_string();
        wal.push(".wal");
        let wal = PathBuf::from(wal);
        if wal.exists() {
            if let Err(e) = std::fs::remove_file(&wal) {
                warn!(path = %wal.display(), error = %e, "failed to remove write-ahead log");
            }
        }
        Ok(())
    }

    /// Whether the file for `name` exists; always false for in-memory names
    pub fn database_exists(&self, name: &str) -> bool {
        self.resolve_path(name).is_some_and(|path| path.exists())
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
