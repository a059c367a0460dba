// ABOUTME: Library root for tenant-sync
// ABOUTME: One-way, key-diffing table synchronization between tenant databases

pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod postgres;
pub mod registry;
pub mod row;
pub mod sync;
pub mod utils;

pub use config::{Config, SyncSettings, TenantConfig};
pub use driver::{ColumnInfo, ColumnMapping, Connection, Driver, TableIdentity};
pub use error::{Result, SyncError};
pub use postgres::PgDriver;
pub use registry::{ConnectionDescriptor, ConnectionRegistry, StaticRegistry};
pub use row::{Row, Value};
pub use sync::{DataSyncer, RowPredicate, SyncReport, SyncRequest, TransferMode};
