//! duckbridge - Handle-Based DuckDB Bridge for Managed Hosts
//!
//! duckbridge lets a garbage-collected host (Java/Kotlin through JNI, Swift,
//! or anything that can call a C ABI) drive an embedded DuckDB engine
//! through opaque 64-bit handles, and get query results back as plain JSON.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use duckbridge::bridge;
//!
//! let db = bridge::open_database(None)?; // in-memory
//! let conn = bridge::connect(db)?;
//!
//! bridge::execute(conn, "CREATE TABLE t(a INT, b TEXT)")?;
//! bridge::execute(conn, "INSERT INTO t VALUES (1,'x'),(2,NULL)")?;
//!
//! let rows = bridge::query(conn, "SELECT a,b FROM t ORDER BY a")?;
//! assert_eq!(rows, r#"[{"a":1,"b":"x"},{"a":2,"b":null}]"#);
//!
//! // Prepared statements keep their bindings between executions
//! let stmt = bridge::prepare(conn, "SELECT b FROM t WHERE a = ?")?;
//! bridge::bind(stmt, 1, 2i64)?;
//! assert_eq!(bridge::execute_prepared(stmt)?, r#"[{"b":null}]"#);
//!
//! bridge::close_database(db); // invalidates conn and stmt as well
//! # Ok::<(), duckbridge::BridgeError>(())
//! ```
//!
//! # Key Features
//!
//! - **Opaque Handles**: generational ids instead of pointers, so stale or
//!   mistyped handles are rejected instead of crashing the host
//! - **JSON Results**: one array of row objects per query, no type metadata
//! - **Growable Bindings**: bind any 1-based position, gaps become NULL
//! - **Two Error Conventions**: `char **error_out` slots or `ERROR:`-prefixed
//!   strings, over the same operations
//! - **Panic Safe**: no Rust panic ever unwinds into the host
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │  c_api::out_param   c_api::prefixed       │  C ABI
//! ├───────────────────────────────────────────┤
//! │  bridge      (handle validation, errors)  │
//! │  registry    (generational handle table)  │
//! ├───────────────────────────────────────────┤
//! │  engine      Database / Connection /      │
//! │              PreparedStatement            │
//! │  bindings    serializer    value   text   │
//! └───────────────────────────────────────────┘
//!                     ↓
//!               DuckDB (bundled)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Parameter binding storage
pub mod bindings;
/// Handle-level operations over the process-wide registry
pub mod bridge;
pub mod engine;
/// Error types for bridge operations
pub mod error;
pub mod manager;
pub mod registry;
pub mod serializer;
pub mod text;
pub mod value;

// Public C API
pub mod c_api;

// Re-exports for Rust consumers

pub use crate::bindings::{BindingStore, BoundValue};
pub use crate::engine::{Connection, Database, OpenOptions, PreparedStatement};
pub use crate::error::{BridgeError, HandleKind, Result};
pub use crate::manager::{DatabaseManager, ParquetExport};
pub use crate::registry::RawHandle;
pub use crate::serializer::{serialize_chunks, MaterializedResult};

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library major version
pub const VERSION_MAJOR: u32 = 0;

/// Library minor version
pub const VERSION_MINOR: u32 = 1;

/// Library patch version
pub const VERSION_PATCH: u32 = 0;
