// ABOUTME: Data-access seam between the sync core and a concrete database driver
// ABOUTME: Defines table identity, catalog column metadata and the Driver/Connection traits

use async_trait::async_trait;
use std::fmt;

use crate::error::{Result, SyncError};
use crate::registry::ConnectionDescriptor;
use crate::row::Row;
use crate::sync::materialize::TabularBuffer;
use crate::sync::query::{InsertStatement, SelectStatement};
use crate::utils::quote_ident;

/// Addresses a table within a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentity {
    pub schema: String,
    pub table: String,
}

impl TableIdentity {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Reject empty table or schema names before any catalog lookup.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(SyncError::invalid_argument("table name must not be empty"));
        }
        if self.schema.trim().is_empty() {
            return Err(SyncError::invalid_argument("schema name must not be empty"));
        }
        Ok(())
    }

    /// Schema-qualified, quoted name for use in generated SQL.
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Catalog metadata for one column, in catalog ordinal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_identity: bool,
    pub is_generated: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_identity: false,
            is_generated: false,
        }
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }
}

/// Maps one buffer column onto one destination column for a bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub source: String,
    pub destination: String,
}

impl ColumnMapping {
    pub fn identical(column: &str) -> Self {
        Self {
            source: column.to_string(),
            destination: column.to_string(),
        }
    }
}

/// Opens connections for resolved tenants.
#[async_trait]
pub trait Driver: Send + Sync {
    type Connection: Connection;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Connection>;
}

/// One open connection, owned by a single synchronization call.
///
/// Implementations must not retry or impose their own timeouts; every failure
/// is returned as-is.
#[async_trait]
pub trait Connection: Send + Sized {
    /// Columns of `table` in catalog ordinal order.
    async fn table_columns(&mut self, table: &TableIdentity) -> Result<Vec<ColumnInfo>>;

    /// Primary-key columns of `table` in key ordinal order (empty if none).
    async fn primary_key_columns(&mut self, table: &TableIdentity) -> Result<Vec<String>>;

    /// Execute a SELECT and materialize every row.
    async fn select(&mut self, statement: &SelectStatement) -> Result<Vec<Row>>;

    /// Execute one parameterized INSERT, returning the affected row count.
    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64>;

    /// Load `buffer` into `table` in batches of `batch_size` rows.
    async fn bulk_load(
        &mut self,
        buffer: &TabularBuffer,
        table: &TableIdentity,
        mappings: &[ColumnMapping],
        batch_size: usize,
    ) -> Result<u64>;

    /// Release the connection. Never fails; problems are logged.
    async fn close(self);
}
