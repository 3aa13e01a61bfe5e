//! Out-parameter error convention
//!
//! Each fallible function takes a trailing `char **error_out`. On success
//! the slot is left untouched; on failure it receives a message the caller
//! frees with `duckbridge_free_string`. Passing NULL for `error_out` is
//! allowed and simply discards the message.
//!
//! Lifecycle functions (`close`, `disconnect`, `destroy`) have no error
//! channel: they ignore 0 and stale handles.

use std::os::raw::c_char;
use std::ptr;

use super::{
    duckbridge_handle_t, guard, guard_silent, into_c_string, optional_str, require_str,
    write_error,
};
use crate::bindings::BoundValue;
use crate::bridge;
use crate::error::Result;

/// Report `result` through the out-parameter channel
unsafe fn finish<T>(result: Result<T>, error_out: *mut *mut c_char, failed: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            write_error(error_out, &e);
            failed
        }
    }
}

unsafe fn finish_string(result: Result<String>, error_out: *mut *mut c_char) -> *mut c_char {
    finish(result.map(into_c_string), error_out, ptr::null_mut())
}

unsafe fn write_changes(rows_changed_out: *mut u64, changes: u64) {
    if !rows_changed_out.is_null() {
        *rows_changed_out = changes;
    }
}

/// Open a database
///
/// Loads the default extensions (spatial) on a best-effort basis.
///
/// # Parameters
/// * `path` - Database file path; NULL, `""` or `":memory:"` opens an
///   in-memory database
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * Database handle, or 0 on failure
///
/// # Safety
/// * `path` must be NULL or a valid null-terminated C string
/// * `error_out` must be NULL or valid for writes
///
/// # Example
/// ```c
/// char *err = NULL;
/// uint64_t db = duckbridge_open_database("app.duckdb", &err);
/// if (db == 0) {
///     fprintf(stderr, "open failed: %s\n", err);
///     duckbridge_free_string(err);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn duckbridge_open_database(
    path: *const c_char,
    error_out: *mut *mut c_char,
) -> duckbridge_handle_t {
    let result = guard("open_database", || {
        bridge::open_database(optional_str(path, "path")?)
    });
    finish(result, error_out, 0)
}

/// Open a database with JSON options
///
/// Recognised keys: `allow_unsigned_extensions`, `autoload_extensions`,
/// `extensions`, `threads`, `read_only`. Unknown keys are rejected.
///
/// # Parameters
/// * `path` - Database file path, or NULL / `""` / `":memory:"`
/// * `config_json` - JSON object with options (NULL means defaults)
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * Database handle, or 0 on failure
///
/// # Safety
/// * `path` and `config_json` must be NULL or valid null-terminated C strings
/// * `error_out` must be NULL or valid for writes
///
/// # Example
/// ```c
/// uint64_t db = duckbridge_open_database_with_config(
///     NULL, "{\"extensions\": [], \"threads\": 2}", NULL);
/// ```
#[no_mangle]
pub unsafe extern "C" fn duckbridge_open_database_with_config(
    path: *const c_char,
    config_json: *const c_char,
    error_out: *mut *mut c_char,
) -> duckbridge_handle_t {
    let result = guard("open_database_with_config", || {
        let path = optional_str(path, "path")?;
        let config = optional_str(config_json, "config")?.unwrap_or_default();
        bridge::open_database_with_config(path, config)
    });
    finish(result, error_out, 0)
}

/// Close a database
///
/// Every connection and prepared statement derived from it becomes invalid.
///
/// # Parameters
/// * `db` - Database handle (0 and already closed handles are ignored)
#[no_mangle]
pub extern "C" fn duckbridge_close_database(db: duckbridge_handle_t) {
    guard_silent("close_database", || bridge::close_database(db));
}

/// Open a connection to a database
///
/// # Parameters
/// * `db` - Database handle
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * Connection handle, or 0 on failure
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_connect(
    db: duckbridge_handle_t,
    error_out: *mut *mut c_char,
) -> duckbridge_handle_t {
    finish(guard("connect", || bridge::connect(db)), error_out, 0)
}

/// Close a connection and every statement prepared on it
///
/// # Parameters
/// * `conn` - Connection handle (0 and already closed handles are ignored)
#[no_mangle]
pub extern "C" fn duckbridge_disconnect(conn: duckbridge_handle_t) {
    guard_silent("disconnect", || bridge::disconnect(conn));
}

/// Run a query and return its rows as a JSON array of objects
///
/// # Parameters
/// * `conn` - Connection handle
/// * `sql` - SQL text (null-terminated C string, must not be NULL)
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * JSON string (free with `duckbridge_free_string`), or NULL on failure
///
/// # Safety
/// * `sql` must be a valid null-terminated C string
/// * `error_out` must be NULL or valid for writes
///
/// # Example
/// ```c
/// char *err = NULL;
/// char *rows = duckbridge_query(conn, "SELECT 42 AS answer", &err);
/// // rows == "[{\"answer\":42}]"
/// duckbridge_free_string(rows);
/// ```
#[no_mangle]
pub unsafe extern "C" fn duckbridge_query(
    conn: duckbridge_handle_t,
    sql: *const c_char,
    error_out: *mut *mut c_char,
) -> *mut c_char {
    let result = guard("query", || bridge::query(conn, require_str(sql, "SQL")?));
    finish_string(result, error_out)
}

/// Run a single statement and report how many rows it changed
///
/// # Parameters
/// * `conn` - Connection handle
/// * `sql` - SQL text (null-terminated C string, must not be NULL)
/// * `rows_changed_out` - Receives the changed-row count (may be NULL)
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * true on success, false on failure
///
/// # Safety
/// * `sql` must be a valid null-terminated C string
/// * `rows_changed_out` and `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_execute(
    conn: duckbridge_handle_t,
    sql: *const c_char,
    rows_changed_out: *mut u64,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("execute", || bridge::execute(conn, require_str(sql, "SQL")?));
    match result {
        Ok(changes) => {
            write_changes(rows_changed_out, changes);
            true
        }
        Err(e) => {
            write_error(error_out, &e);
            false
        }
    }
}

/// Run a script of one or more statements
///
/// # Parameters
/// * `conn` - Connection handle
/// * `sql` - SQL script (null-terminated C string, must not be NULL)
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * true on success, false on failure
///
/// # Safety
/// * `sql` must be a valid null-terminated C string
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_execute_batch(
    conn: duckbridge_handle_t,
    sql: *const c_char,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("execute_batch", || {
        bridge::execute_batch(conn, require_str(sql, "SQL")?)
    });
    finish(result.map(|()| true), error_out, false)
}

/// Prepare a statement for repeated execution
///
/// The statement starts with one NULL binding per declared parameter.
///
/// # Parameters
/// * `conn` - Connection handle
/// * `sql` - SQL text with `?` or `$n` placeholders (must not be NULL)
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * Statement handle, or 0 on failure
///
/// # Safety
/// * `sql` must be a valid null-terminated C string
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_prepare(
    conn: duckbridge_handle_t,
    sql: *const c_char,
    error_out: *mut *mut c_char,
) -> duckbridge_handle_t {
    let result = guard("prepare", || bridge::prepare(conn, require_str(sql, "SQL")?));
    finish(result, error_out, 0)
}

/// Destroy a prepared statement
///
/// # Parameters
/// * `stmt` - Statement handle (0 and already destroyed handles are ignored)
#[no_mangle]
pub extern "C" fn duckbridge_destroy_prepared(stmt: duckbridge_handle_t) {
    guard_silent("destroy_prepared", || bridge::destroy_prepared(stmt));
}

fn bind_value(stmt: duckbridge_handle_t, index: i32, value: BoundValue) -> Result<bool> {
    bridge::bind(stmt, i64::from(index), value).map(|()| true)
}

/// Bind a string parameter (NULL binds SQL NULL)
///
/// Binding past the current parameter count grows the bindings; the gap is
/// filled with NULL.
///
/// # Parameters
/// * `stmt` - Statement handle
/// * `index` - 1-based parameter position
/// * `value` - Null-terminated UTF-8 string, or NULL
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * true on success, false on failure (bindings unchanged)
///
/// # Safety
/// * `value` must be NULL or a valid null-terminated C string
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_bind_string(
    stmt: duckbridge_handle_t,
    index: i32,
    value: *const c_char,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("bind_string", || {
        let value = optional_str(value, "value")?;
        bind_value(stmt, index, value.into())
    });
    finish(result, error_out, false)
}

/// Bind a 64-bit integer parameter
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_bind_int64(
    stmt: duckbridge_handle_t,
    index: i32,
    value: i64,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("bind_int64", || bind_value(stmt, index, value.into()));
    finish(result, error_out, false)
}

/// Bind a double parameter
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_bind_double(
    stmt: duckbridge_handle_t,
    index: i32,
    value: f64,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("bind_double", || bind_value(stmt, index, value.into()));
    finish(result, error_out, false)
}

/// Bind a boolean parameter
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_bind_bool(
    stmt: duckbridge_handle_t,
    index: i32,
    value: bool,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("bind_bool", || bind_value(stmt, index, value.into()));
    finish(result, error_out, false)
}

/// Bind SQL NULL
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_bind_null(
    stmt: duckbridge_handle_t,
    index: i32,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("bind_null", || bind_value(stmt, index, BoundValue::Null));
    finish(result, error_out, false)
}

/// Bind a JSON array of values to positions 1..n
///
/// Strings, integers, floats, booleans and null bind as their SQL
/// counterparts; arrays and objects bind as JSON text.
///
/// # Parameters
/// * `stmt` - Statement handle
/// * `params_json` - JSON array (must not be NULL)
/// * `error_out` - Receives the error message on failure (may be NULL)
///
/// # Returns
/// * true on success, false on failure
///
/// # Safety
/// * `params_json` must be a valid null-terminated C string
/// * `error_out` must be NULL or valid for writes
///
/// # Example
/// ```c
/// duckbridge_bind_json_params(stmt, "[1, \"two\", 3.5, null, true]", NULL);
/// ```
#[no_mangle]
pub unsafe extern "C" fn duckbridge_bind_json_params(
    stmt: duckbridge_handle_t,
    params_json: *const c_char,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("bind_json_params", || {
        bridge::bind_json_params(stmt, require_str(params_json, "parameters")?)
    });
    finish(result.map(|_| true), error_out, false)
}

/// Reset every binding to NULL, keeping the binding count
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_clear_bindings(
    stmt: duckbridge_handle_t,
    error_out: *mut *mut c_char,
) -> bool {
    let result = guard("clear_bindings", || bridge::clear_bindings(stmt));
    finish(result.map(|()| true), error_out, false)
}

/// Execute a prepared statement and return its rows as JSON
///
/// Bindings are left in place, so the statement can be executed again.
///
/// # Returns
/// * JSON string (free with `duckbridge_free_string`), or NULL on failure
///
/// # Safety
/// * `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_execute_prepared(
    stmt: duckbridge_handle_t,
    error_out: *mut *mut c_char,
) -> *mut c_char {
    finish_string(guard("execute_prepared", || bridge::execute_prepared(stmt)), error_out)
}

/// Execute a prepared statement and report how many rows it changed
///
/// # Safety
/// * `rows_changed_out` and `error_out` must be NULL or valid for writes
#[no_mangle]
pub unsafe extern "C" fn duckbridge_run_prepared(
    stmt: duckbridge_handle_t,
    rows_changed_out: *mut u64,
    error_out: *mut *mut c_char,
) -> bool {
    match guard("run_prepared", || bridge::run_prepared(stmt)) {
        Ok(changes) => {
            write_changes(rows_changed_out, changes);
            true
        }
        Err(e) => {
            write_error(error_out, &e);
            false
        }
    }
}

/// Check whether an extension was loaded when the database was opened
///
/// # Returns
/// * true if loaded; false if not loaded or on an invalid handle or name
///
/// # Safety
/// * `name` must be NULL or a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn duckbridge_has_extension(
    db: duckbridge_handle_t,
    name: *const c_char,
) -> bool {
    guard("has_extension", || {
        bridge::has_extension(db, require_str(name, "extension name")?)
    })
    .unwrap_or(false)
}

/// Check whether the spatial extension is available
#[no_mangle]
pub extern "C" fn duckbridge_has_spatial_extension(db: duckbridge_handle_t) -> bool {
    guard("has_spatial_extension", || {
        bridge::has_extension(db, crate::engine::SPATIAL_EXTENSION)
    })
    .unwrap_or(false)
}
