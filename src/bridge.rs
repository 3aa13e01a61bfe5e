//! Handle-level operations over the process-wide registry
//!
//! This is the native half of the boundary: every function takes and
//! returns raw handles and plain Rust strings, validates handles before
//! touching the engine, and reports failures as [`BridgeError`]. The C ABI
//! conventions in [`crate::c_api`] are thin shells over these functions.
//!
//! The registry lock is held only for lookups and insertions. Engine work
//! runs under the resource's own mutex, so independent connections can be
//! used from different threads.

use std::sync::{Mutex, MutexGuard, OnceLock};

use tracing::{error, info};

use crate::bindings::BoundValue;
use crate::engine::{lock, Database, OpenOptions};
use crate::error::{BridgeError, Result};
use crate::registry::{RawHandle, Registry, Removed};
use crate::serializer::changes_json;

fn registry() -> MutexGuard<'static, Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    lock(REGISTRY.get_or_init(|| Mutex::new(Registry::new())))
}

/// Release removed resources, children first, outside the registry lock
fn release(removed: Vec<Removed>) -> usize {
    let count = removed.len();
    drop(removed);
    count
}

/// Log a failure on its way to the error channel
pub(crate) fn report<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!(operation, error = %e, "bridge call failed");
    }
    result
}

/// Open a database with default options
pub fn open_database(path: Option<&str>) -> Result<RawHandle> {
    open_database_with_options(path, &OpenOptions::default())
}

/// Open a database with options given as JSON (empty means defaults)
pub fn open_database_with_config(path: Option<&str>, config_json: &str) -> Result<RawHandle> {
    let options = OpenOptions::from_json(config_json)?;
    open_database_with_options(path, &options)
}

/// Open a database and register it
pub fn open_database_with_options(path: Option<&str>, options: &OpenOptions) -> Result<RawHandle> {
    let db = Database::open(path, options)?;
    let handle = registry().insert_database(db);
    info!(handle, "database handle issued");
    Ok(handle)
}

/// Close a database, invalidating every connection and statement under it
///
/// Closing 0 or an already closed handle does nothing.
pub fn close_database(db: RawHandle) {
    let removed = registry().remove(db);
    let released = release(removed);
    if released > 0 {
        info!(handle = db, released, "database closed");
    }
}

/// Open a connection to a live database
pub fn connect(db: RawHandle) -> Result<RawHandle> {
    let database = registry().database(db)?;
    let conn = lock(&database).connect()?;
    let handle = registry().insert_connection(db, conn)?;
    info!(handle, database = db, "connection opened");
    Ok(handle)
}

/// Close a connection and the statements prepared on it
pub fn disconnect(conn: RawHandle) {
    let removed = registry().remove(conn);
    let released = release(removed);
    if released > 0 {
        info!(handle = conn, released, "connection closed");
    }
}

/// Run ad-hoc SQL and return the serialized rows
pub fn query(conn: RawHandle, sql: &str) -> Result<String> {
    let session = registry().connection(conn)?;
    let json = lock(&session).query(sql)?;
    Ok(json)
}

/// Run a single statement and return the number of rows it changed
pub fn execute(conn: RawHandle, sql: &str) -> Result<u64> {
    let session = registry().connection(conn)?;
    let changes = lock(&session).execute(sql)?;
    Ok(changes as u64)
}

/// Run a multi-statement script
pub fn execute_batch(conn: RawHandle, sql: &str) -> Result<()> {
    let session = registry().connection(conn)?;
    lock(&session).execute_batch(sql)?;
    Ok(())
}

/// Compile a statement on a live connection
pub fn prepare(conn: RawHandle, sql: &str) -> Result<RawHandle> {
    let session = registry().connection(conn)?;
    let stmt = lock(&session).prepare(sql)?;
    let handle = registry().insert_statement(conn, stmt)?;
    info!(handle, connection = conn, "statement handle issued");
    Ok(handle)
}

/// Destroy a prepared statement; 0 and stale handles are ignored
pub fn destroy_prepared(stmt: RawHandle) {
    let removed = registry().remove(stmt);
    release(removed);
}

/// Bind a value at a 1-based position
pub fn bind(stmt: RawHandle, index: i64, value: impl Into<BoundValue>) -> Result<()> {
    let prepared = registry().statement(stmt)?;
    let mut guard = lock(&prepared);
    guard.bindings_mut().bind(index, value)
}

/// Bind SQL NULL at a 1-based position
pub fn bind_null(stmt: RawHandle, index: i64) -> Result<()> {
    bind(stmt, index, BoundValue::Null)
}

/// Bind a JSON array positionally, returning how many values were bound
pub fn bind_json_params(stmt: RawHandle, json: &str) -> Result<usize> {
    let prepared = registry().statement(stmt)?;
    let mut guard = lock(&prepared);
    guard.bindings_mut().bind_json(json)
}

/// Reset every binding to null
pub fn clear_bindings(stmt: RawHandle) -> Result<()> {
    let prepared = registry().statement(stmt)?;
    lock(&prepared).bindings_mut().clear();
    Ok(())
}

/// Execute a prepared statement and return the serialized rows
pub fn execute_prepared(stmt: RawHandle) -> Result<String> {
    let prepared = registry().statement(stmt)?;
    let json = lock(&prepared).execute()?;
    Ok(json)
}

/// Execute a prepared statement and return the number of rows changed
pub fn run_prepared(stmt: RawHandle) -> Result<u64> {
    let prepared = registry().statement(stmt)?;
    let changes = lock(&prepared).run()?;
    Ok(changes as u64)
}

/// `{"changes":N}` payload for a prepared statement run
pub fn run_prepared_json(stmt: RawHandle) -> Result<String> {
    run_prepared(stmt).map(changes_json)
}

/// `{"changes":N}` payload for an ad-hoc statement
pub fn execute_json(conn: RawHandle, sql: &str) -> Result<String> {
    execute(conn, sql).map(changes_json)
}

/// Whether `name` was loaded when the database was opened
pub fn has_extension(db: RawHandle, name: &str) -> Result<bool> {
    let database = registry().database(db)?;
    let loaded = lock(&database).has_extension(name);
    Ok(loaded)
}

/// Map a missing foreign string to its error
pub(crate) fn require<'a>(value: Option<&'a str>, what: &'static str) -> Result<&'a str> {
    value.ok_or(BridgeError::InvalidString(what))
}
