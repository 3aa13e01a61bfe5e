//! String-return error convention
//!
//! For hosts whose bridge can only pass back a single value per call. A
//! string result is either the payload or `ERROR:` followed by the message;
//! handle results are 0 on failure and bind results are `false`. The
//! returned strings are freed with `duckbridge_free_string`.
//!
//! Lifecycle calls without a result (`close`, `disconnect`, `destroy`) are
//! shared with the out-parameter convention.

use std::os::raw::c_char;

use super::{duckbridge_handle_t, guard, into_c_string, optional_str, prefixed_error, require_str};
use crate::bindings::BoundValue;
use crate::bridge;
use crate::error::Result;

fn respond(result: Result<String>) -> *mut c_char {
    into_c_string(result.unwrap_or_else(|e| prefixed_error(&e)))
}

/// Open a database
///
/// # Parameters
/// * `path` - Database file path, or NULL / `""` / `":memory:"`
///
/// # Returns
/// * Database handle, or 0 on failure
///
/// # Safety
/// * `path` must be NULL or a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn duckbridge_str_open_database(path: *const c_char) -> duckbridge_handle_t {
    guard("open_database", || bridge::open_database(optional_str(path, "path")?)).unwrap_or(0)
}

/// Open a connection to a database
///
/// # Returns
/// * Connection handle, or 0 on failure
#[no_mangle]
pub extern "C" fn duckbridge_str_connect(db: duckbridge_handle_t) -> duckbridge_handle_t {
    guard("connect", || bridge::connect(db)).unwrap_or(0)
}

/// Run a query
///
/// # Parameters
/// * `conn` - Connection handle
/// * `sql` - SQL text (null-terminated C string)
///
/// # Returns
/// * JSON array of row objects, or `ERROR:<message>`; never NULL
///
/// # Safety
/// * `sql` must be NULL or a valid null-terminated C string
///
/// # Example
/// ```c
/// char *out = duckbridge_str_query(conn, "SELECT 1 AS one");
/// if (strncmp(out, "ERROR:", 6) == 0) { /* handle error */ }
/// duckbridge_free_string(out);
/// ```
#[no_mangle]
pub unsafe extern "C" fn duckbridge_str_query(
    conn: duckbridge_handle_t,
    sql: *const c_char,
) -> *mut c_char {
    respond(guard("query", || bridge::query(conn, require_str(sql, "SQL")?)))
}

/// Run a single statement
///
/// # Returns
/// * `{"changes":N}`, or `ERROR:<message>`; never NULL
///
/// # Safety
/// * `sql` must be NULL or a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn duckbridge_str_execute(
    conn: duckbridge_handle_t,
    sql: *const c_char,
) -> *mut c_char {
    respond(guard("execute", || {
        bridge::execute_json(conn, require_str(sql, "SQL")?)
    }))
}

/// Prepare a statement
///
/// # Returns
/// * Statement handle, or 0 on failure
///
/// # Safety
/// * `sql` must be NULL or a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn duckbridge_str_prepare(
    conn: duckbridge_handle_t,
    sql: *const c_char,
) -> duckbridge_handle_t {
    guard("prepare", || bridge::prepare(conn, require_str(sql, "SQL")?)).unwrap_or(0)
}

fn bind_value(operation: &'static str, stmt: duckbridge_handle_t, index: i32, value: BoundValue) -> bool {
    guard(operation, || bridge::bind(stmt, i64::from(index), value)).is_ok()
}

/// Bind a string parameter (NULL binds SQL NULL)
///
/// # Returns
/// * true on success, false on an invalid handle, index or string
///
/// # Safety
/// * `value` must be NULL or a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn duckbridge_str_bind_string(
    stmt: duckbridge_handle_t,
    index: i32,
    value: *const c_char,
) -> bool {
    guard("bind_string", || {
        let value = optional_str(value, "value")?;
        bridge::bind(stmt, i64::from(index), value)
    })
    .is_ok()
}

/// Bind a 64-bit integer parameter
#[no_mangle]
pub extern "C" fn duckbridge_str_bind_int64(stmt: duckbridge_handle_t, index: i32, value: i64) -> bool {
    bind_value("bind_int64", stmt, index, value.into())
}

/// Bind a double parameter
#[no_mangle]
pub extern "C" fn duckbridge_str_bind_double(stmt: duckbridge_handle_t, index: i32, value: f64) -> bool {
    bind_value("bind_double", stmt, index, value.into())
}

/// Bind a boolean parameter
#[no_mangle]
pub extern "C" fn duckbridge_str_bind_bool(stmt: duckbridge_handle_t, index: i32, value: bool) -> bool {
    bind_value("bind_bool", stmt, index, value.into())
}

/// Bind SQL NULL
#[no_mangle]
pub extern "C" fn duckbridge_str_bind_null(stmt: duckbridge_handle_t, index: i32) -> bool {
    bind_value("bind_null", stmt, index, BoundValue::Null)
}

/// Reset every binding to NULL
#[no_mangle]
pub extern "C" fn duckbridge_str_clear_bindings(stmt: duckbridge_handle_t) -> bool {
    guard("clear_bindings", || bridge::clear_bindings(stmt)).is_ok()
}

/// Execute a prepared statement
///
/// # Returns
/// * JSON array of row objects, or `ERROR:<message>`; never NULL
#[no_mangle]
pub extern "C" fn duckbridge_str_execute_prepared(stmt: duckbridge_handle_t) -> *mut c_char {
    respond(guard("execute_prepared", || bridge::execute_prepared(stmt)))
}

/// Execute a prepared statement that changes rows
///
/// # Returns
/// * `{"changes":N}`, or `ERROR:<message>`; never NULL
#[no_mangle]
pub extern "C" fn duckbridge_str_run_prepared(stmt: duckbridge_handle_t) -> *mut c_char {
    respond(guard("run_prepared", || bridge::run_prepared_json(stmt)))
}
