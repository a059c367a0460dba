// ABOUTME: Error taxonomy shared by every stage of a table synchronization
// ABOUTME: Driver failures are carried unchanged so callers see the original diagnostic

use thiserror::Error;

/// Errors surfaced by the synchronization engine and its collaborators.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required argument was missing or empty (table name, schema, materializer input).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A tenant code could not be resolved to a connection.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any failure reported by the PostgreSQL driver (connectivity, constraint, timeout).
    #[error("Data access error: {0}")]
    DataAccess(#[from] tokio_postgres::Error),

    /// TLS setup failed before a connection could be attempted.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// A result column whose type has no tagged scalar representation.
    #[error("Unsupported type '{type_name}' for column '{column}'")]
    UnsupportedType { column: String, type_name: String },

    /// Configuration file content was rejected.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (reading the configuration file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SyncError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        SyncError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SyncError::NotFound(message.into())
    }

    pub fn unsupported_type(column: impl Into<String>, type_name: impl Into<String>) -> Self {
        SyncError::UnsupportedType {
            column: column.into(),
            type_name: type_name.into(),
        }
    }
}

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
