//! Error types for the bridge
//!
//! The `Display` text of every variant is exactly what a host sees in its
//! error channel, so engine messages are carried verbatim and local failures
//! use short fixed sentences.

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// The kinds of resource a caller can hold a handle to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Engine instance (one per open database file or in-memory database)
    Database,
    /// Session against a database
    Connection,
    /// Compiled statement with its parameter bindings
    Statement,
}

impl HandleKind {
    /// Lower-case noun used in error messages and logs
    pub fn noun(self) -> &'static str {
        match self {
            HandleKind::Database => "database",
            HandleKind::Connection => "connection",
            HandleKind::Statement => "statement",
        }
    }

    /// Tag stored in the top byte of a raw handle
    pub(crate) fn tag(self) -> u64 {
        match self {
            HandleKind::Database => 1,
            HandleKind::Connection => 2,
            HandleKind::Statement => 3,
        }
    }
}

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Zero, stale, destroyed, or wrong-kind handle
    #[error("Invalid {} handle", .0.noun())]
    InvalidHandle(HandleKind),

    /// NULL or non-UTF-8 string received from the host
    #[error("Invalid {0} string")]
    InvalidString(&'static str),

    /// SQL text with nothing but whitespace
    #[error("SQL string is empty")]
    EmptySql,

    /// Parameter positions are 1-based
    #[error("Parameter index {0} is invalid (must be >= 1)")]
    InvalidParameterIndex(i64),

    /// Parameter position beyond what any statement can declare
    #[error("Parameter index {0} exceeds the maximum of {max}", max = crate::bindings::MAX_PARAMETER_INDEX)]
    ParameterIndexTooLarge(i64),

    /// Error reported by the engine, message passed through untouched
    #[error("{0}")]
    Engine(String),

    /// Malformed open options
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed JSON parameter list
    #[error("Invalid parameters: {0}")]
    Params(String),

    /// Named database is not open in a manager
    #[error("Database not open: {0}")]
    NotOpen(String),

    /// Named table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// File system failure outside the engine
    #[error("I/O error: {0}")]
    Io(String),

    /// A panic was caught at the foreign boundary
    #[error("Internal error: {0}")]
    Panic(String),
}

impl BridgeError {
    /// True for errors detected before reaching the engine
    pub fn is_local(&self) -> bool {
        !matches!(self, BridgeError::Engine(_))
    }
}

impl From<duckdb::Error> for BridgeError {
    fn from(err: duckdb::Error) -> Self {
        BridgeError::Engine(err.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle_messages() {
        assert_eq!(
            BridgeError::InvalidHandle(HandleKind::Connection).to_string(),
            "Invalid connection handle"
        );
        assert_eq!(
            BridgeError::InvalidHandle(HandleKind::Statement).to_string(),
            "Invalid statement handle"
        );
        assert_eq!(
            BridgeError::InvalidString("SQL").to_string(),
            "Invalid SQL string"
        );
        assert_eq!(BridgeError::EmptySql.to_string(), "SQL string is empty");
        assert!(BridgeError::EmptySql.is_local());
    }

    #[test]
    fn test_engine_message_is_verbatim() {
        let err = BridgeError::Engine("Parser Error: syntax error at or near \"SELEC\"".into());
        assert_eq!(err.to_string(), "Parser Error: syntax error at or near \"SELEC\"");
        assert!(!err.is_local());
        assert!(BridgeError::InvalidParameterIndex(0).is_local());
    }
}
