// ABOUTME: In-memory Driver for exercising DataSyncer without a database
// ABOUTME: Records executed statements, writes and connection lifecycle for assertions

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use tenant_sync::driver::{ColumnInfo, ColumnMapping, Connection, Driver, TableIdentity};
use tenant_sync::postgres::types::coerce_param;
use tenant_sync::sync::materialize::TabularBuffer;
use tenant_sync::sync::query::{InsertStatement, SelectStatement};
use tenant_sync::{ConnectionDescriptor, Result, Row, StaticRegistry, SyncError, Value};

/// One table held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<String>,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    fn data_type(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.data_type.as_str())
    }
}

#[derive(Debug, Default)]
pub struct DatabaseState {
    pub tables: HashMap<String, MemoryTable>,
    pub selects: Vec<SelectStatement>,
    pub inserts: usize,
    pub bulk_batches: Vec<usize>,
    /// 1-based insert number that fails, if any
    pub fail_on_insert: Option<usize>,
}

/// A shared handle to one tenant database.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, schema: &str, name: &str, table: MemoryTable) -> Self {
        self.state()
            .tables
            .insert(key(&TableIdentity::new(schema, name)), table);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, DatabaseState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn rows(&self, schema: &str, name: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(&key(&TableIdentity::new(schema, name)))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn fail_on_insert(&self, n: usize) {
        self.state().fail_on_insert = Some(n);
    }
}

fn key(table: &TableIdentity) -> String {
    format!("{}.{}", table.schema, table.table)
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    pub opened: usize,
    pub closed: usize,
}

/// Driver that hands out connections to in-memory databases keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    databases: HashMap<String, MemoryDatabase>,
    unreachable: HashSet<String>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, url: &str, database: MemoryDatabase) -> Self {
        self.databases.insert(url.to_string(), database);
        self
    }

    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    pub fn opened(&self) -> usize {
        self.lifecycle.lock().map(|l| l.opened).unwrap_or_default()
    }

    pub fn closed(&self) -> usize {
        self.lifecycle.lock().map(|l| l.closed).unwrap_or_default()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Connection = MemoryConnection;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<MemoryConnection> {
        if self.unreachable.contains(&descriptor.url) {
            return Err(SyncError::invalid_argument(format!(
                "connection refused: {}",
                descriptor.tenant
            )));
        }
        let database = self
            .databases
            .get(&descriptor.url)
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("no database at {}", descriptor.url)))?;

        if let Ok(mut lifecycle) = self.lifecycle.lock() {
            lifecycle.opened += 1;
        }
        Ok(MemoryConnection {
            database,
            lifecycle: Arc::clone(&self.lifecycle),
        })
    }
}

pub struct MemoryConnection {
    database: MemoryDatabase,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

/// `pg_type` name for the catalog types the in-memory tables use.
fn pg_type_name(data_type: &str) -> Option<&'static str> {
    Some(match data_type {
        "smallint" => "int2",
        "integer" => "int4",
        "bigint" => "int8",
        "numeric" => "numeric",
        "real" => "float4",
        "double precision" => "float8",
        "boolean" => "bool",
        "text" => "text",
        "character varying" => "varchar",
        "date" => "date",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "uuid" => "uuid",
        _ => return None,
    })
}

/// Store `value` in a column of `data_type` the way PostgreSQL would coerce
/// a bound parameter (or COPY text, which arrives as `Value::Text`).
fn coerce(data_type: &str, value: &Value) -> Result<Value> {
    match pg_type_name(data_type) {
        Some(type_name) => coerce_param(value, type_name)
            .map_err(|e| SyncError::invalid_argument(e.to_string())),
        None => Ok(value.clone()),
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn table_columns(&mut self, table: &TableIdentity) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .database
            .state()
            .tables
            .get(&key(table))
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn primary_key_columns(&mut self, table: &TableIdentity) -> Result<Vec<String>> {
        Ok(self
            .database
            .state()
            .tables
            .get(&key(table))
            .map(|t| t.primary_key.clone())
            .unwrap_or_default())
    }

    async fn select(&mut self, statement: &SelectStatement) -> Result<Vec<Row>> {
        let mut state = self.database.state();
        state.selects.push(statement.clone());
        let table = state
            .tables
            .get(&key(&statement.table))
            .ok_or_else(|| SyncError::not_found(format!("relation {} does not exist", statement.table)))?;
        if let Some(missing) = statement
            .columns
            .iter()
            .find(|c| table.data_type(c).is_none())
        {
            return Err(SyncError::invalid_argument(format!(
                "column \"{}\" does not exist",
                missing
            )));
        }

        let limit = statement.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(table
            .rows
            .iter()
            .take(limit)
            .map(|row| {
                statement
                    .columns
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect())
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64> {
        let mut state = self.database.state();
        state.inserts += 1;
        if state.fail_on_insert == Some(state.inserts) {
            return Err(SyncError::invalid_argument("duplicate key value violates unique constraint"));
        }
        let table = state
            .tables
            .get_mut(&key(&statement.table))
            .ok_or_else(|| SyncError::not_found(format!("relation {} does not exist", statement.table)))?;
        let mut row = Row::new();
        for (column, value) in statement.columns.iter().zip(&statement.values) {
            let value = coerce(table.data_type(column).unwrap_or("text"), value)?;
            row.push(column.clone(), value);
        }
        table.rows.push(row);
        Ok(1)
    }

    async fn bulk_load(
        &mut self,
        buffer: &TabularBuffer,
        table: &TableIdentity,
        mappings: &[ColumnMapping],
        batch_size: usize,
    ) -> Result<u64> {
        let mut state = self.database.state();
        let target = state
            .tables
            .get(&key(table))
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("relation {} does not exist", table)))?;

        let mut loaded = Vec::with_capacity(buffer.row_count());
        for values in buffer.rows() {
            let mut row = Row::new();
            for mapping in mappings {
                let idx = buffer.column_index(&mapping.source).ok_or_else(|| {
                    SyncError::invalid_argument(format!("unknown column {}", mapping.source))
                })?;
                let value = match &values[idx] {
                    None => Value::Null,
                    Some(text) => coerce(
                        target.data_type(&mapping.destination).unwrap_or("text"),
                        &Value::Text(text.clone()),
                    )?,
                };
                row.push(mapping.destination.clone(), value);
            }
            loaded.push(row);
        }

        for chunk in loaded.chunks(batch_size.max(1)) {
            state.bulk_batches.push(chunk.len());
        }
        let count = loaded.len() as u64;
        if let Some(t) = state.tables.get_mut(&key(table)) {
            t.rows.extend(loaded);
        }
        Ok(count)
    }

    async fn close(self) {
        if let Ok(mut lifecycle) = self.lifecycle.lock() {
            lifecycle.closed += 1;
        }
    }
}

pub const SOURCE_URL: &str = "memory://acme";
pub const DESTINATION_URL: &str = "memory://globex";

pub fn registry() -> StaticRegistry {
    StaticRegistry::default()
        .with_tenant("acme", SOURCE_URL)
        .with_tenant("globex", DESTINATION_URL)
}

pub fn order_row(id: i64, customer: &str, total: &str) -> Row {
    [
        ("id", Value::Int(id)),
        ("customer", Value::from(customer)),
        ("total", Value::Decimal(Decimal::from_str(total).unwrap_or_default())),
    ]
    .into_iter()
    .collect()
}

/// `orders` with an int key, a customer name, a numeric total and a row-version column.
pub fn source_orders(rows: Vec<Row>) -> MemoryTable {
    MemoryTable::new(vec![
        ColumnInfo::new("id", "integer"),
        ColumnInfo::new("customer", "text"),
        ColumnInfo::new("total", "numeric"),
        ColumnInfo::new("version", "rowversion"),
    ])
    .with_primary_key(&["id"])
    .with_rows(rows)
}

pub fn destination_orders(rows: Vec<Row>) -> MemoryTable {
    MemoryTable::new(vec![
        ColumnInfo::new("id", "integer"),
        ColumnInfo::new("customer", "text"),
        ColumnInfo::new("total", "numeric"),
    ])
    .with_primary_key(&["id"])
    .with_rows(rows)
}

/// Destination rows sorted by `id` for order-insensitive comparison.
pub fn sorted_by_id(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by_key(|r| match r.get("id") {
        Some(Value::Int(i)) => *i,
        _ => i64::MIN,
    });
    rows
}
