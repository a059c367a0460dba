// ABOUTME: DataSyncer - runs one source-to-destination table synchronization
// ABOUTME: Owns both connections for the call and releases them on every exit path

use std::time::Instant;

use crate::config::SyncSettings;
use crate::driver::{Connection, Driver, TableIdentity};
use crate::error::Result;
use crate::registry::ConnectionRegistry;
use crate::row::Value;
use crate::sync::columns::reconcile_columns;
use crate::sync::diff::{diff_rows, KeyIndex};
use crate::sync::keys::resolve_keys;
use crate::sync::plan::TransferPlan;
use crate::sync::predicate::{apply_predicate, RowPredicate};
use crate::sync::query::{build_key_select, ExtractOptions};
use crate::sync::transfer::{execute_transfer, TransferMode};

/// Input for one synchronization call.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub source_db: String,
    pub destination_db: String,
    pub table: String,
    pub schema: String,
    /// In-memory filter over fetched source rows
    pub predicate: Option<RowPredicate>,
    /// Explicit key columns; discovered from the destination primary key when `None`
    pub key_columns: Option<Vec<String>>,
    pub bulk_insert: bool,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u64>,
    /// Run every read and the diff, but write nothing
    pub dry_run: bool,
}

impl SyncRequest {
    pub fn new(
        source_db: impl Into<String>,
        destination_db: impl Into<String>,
        table: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            source_db: source_db.into(),
            destination_db: destination_db.into(),
            table: table.into(),
            schema: schema.into(),
            predicate: None,
            key_columns: None,
            bulk_insert: true,
            where_clause: None,
            order_by: None,
            top: None,
            dry_run: false,
        }
    }

    pub fn with_predicate(mut self, predicate: RowPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_key_columns(mut self, columns: Vec<String>) -> Self {
        self.key_columns = Some(columns);
        self
    }

    pub fn with_bulk_insert(mut self, bulk_insert: bool) -> Self {
        self.bulk_insert = bulk_insert;
        self
    }

    pub fn with_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn with_top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn table_identity(&self) -> TableIdentity {
        TableIdentity::new(&self.schema, &self.table)
    }

    pub fn transfer_mode(&self) -> TransferMode {
        TransferMode::from_bulk_flag(self.bulk_insert)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            where_clause: self.where_clause.clone(),
            order_by: self.order_by.clone(),
            top: self.top,
        }
    }
}

/// What one synchronization call read and wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub table: TableIdentity,
    pub mode: TransferMode,
    pub key_columns: Vec<String>,
    pub columns: Vec<String>,
    pub source_rows: usize,
    pub destination_keys: usize,
    pub filtered_out: usize,
    pub diff_rows: usize,
    pub rows_written: u64,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    fn new(table: TableIdentity, mode: TransferMode, dry_run: bool) -> Self {
        Self {
            table,
            mode,
            key_columns: Vec::new(),
            columns: Vec::new(),
            source_rows: 0,
            destination_keys: 0,
            filtered_out: 0,
            diff_rows: 0,
            rows_written: 0,
            dry_run,
            duration_ms: 0,
        }
    }
}

/// One-way table synchronizer between tenant databases.
///
/// Holds no per-call state: concurrent calls for different tables or tenants
/// share nothing but the registry and driver.
pub struct DataSyncer<R, D> {
    registry: R,
    driver: D,
    settings: SyncSettings,
}

impl<R, D> DataSyncer<R, D>
where
    R: ConnectionRegistry,
    D: Driver,
{
    pub fn new(registry: R, driver: D, settings: SyncSettings) -> Self {
        Self {
            registry,
            driver,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Copy the source rows missing at the destination.
    ///
    /// This is the main entry point. It:
    /// 1. Resolves both tenants and opens one connection to each
    /// 2. Reconciles columns and resolves key columns
    /// 3. Fetches destination keys and the source rows
    /// 4. Applies the predicate and diffs on key tuples
    /// 5. Writes the diff in bulk or row by row
    /// 6. Releases both connections, whether or not a step failed
    pub async fn synchronize(&self, request: &SyncRequest) -> Result<SyncReport> {
        let start = Instant::now();
        let table = request.table_identity();
        table.validate()?;

        let source_descriptor = self.registry.resolve(&request.source_db)?;
        let destination_descriptor = self.registry.resolve(&request.destination_db)?;
        tracing::info!(
            "Synchronizing {} from {} to {}",
            table,
            source_descriptor,
            destination_descriptor
        );

        let mut source = self.driver.connect(&source_descriptor).await?;
        let mut destination = match self.driver.connect(&destination_descriptor).await {
            Ok(conn) => conn,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };

        let result = self
            .run(&mut source, &mut destination, request, &table)
            .await;

        source.close().await;
        destination.close().await;

        let mut report = result?;
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Synchronized {}: {} source rows, {} new, {} written in {}ms{}",
            report.table,
            report.source_rows,
            report.diff_rows,
            report.rows_written,
            report.duration_ms,
            if report.dry_run { " (dry run)" } else { "" }
        );

        Ok(report)
    }

    async fn run<C: Connection>(
        &self,
        source: &mut C,
        destination: &mut C,
        request: &SyncRequest,
        table: &TableIdentity,
    ) -> Result<SyncReport> {
        let mode = request.transfer_mode();
        let mut report = SyncReport::new(table.clone(), mode, request.dry_run);

        let columns = reconcile_columns(source, destination, table, &self.settings).await?;
        let keys = resolve_keys(request.key_columns.as_deref(), destination, table).await?;
        report.key_columns = keys.columns().to_vec();
        report.columns = columns.source.clone();

        if columns.is_empty() {
            tracing::warn!(
                "No columns in common between source and destination {}, nothing to synchronize",
                table
            );
            return Ok(report);
        }

        let destination_keys: Vec<Vec<Value>> = if keys.is_empty() {
            Vec::new()
        } else {
            destination
                .select(&build_key_select(table, &keys))
                .await?
                .iter()
                .map(|row| row.project(keys.columns()))
                .collect()
        };
        report.destination_keys = destination_keys.len();

        let plan = TransferPlan::build(
            table,
            columns,
            keys,
            &request.extract_options(),
            &destination_keys,
        );
        tracing::debug!("Source statement: {}", plan.select.to_sql());

        let source_rows = source.select(&plan.select).await?;
        report.source_rows = source_rows.len();
        if source_rows.is_empty() {
            tracing::info!("No source rows for {}", table);
            return Ok(report);
        }

        let (candidates, filtered_out) = apply_predicate(source_rows, request.predicate.as_ref());
        report.filtered_out = filtered_out;
        if let Some(predicate) = &request.predicate {
            tracing::debug!(
                "Predicate '{}' removed {} rows",
                predicate.description(),
                filtered_out
            );
        }

        let index = KeyIndex::from_tuples(destination_keys);
        let diff = diff_rows(candidates, &index, &plan.keys);
        report.diff_rows = diff.len();
        tracing::info!("{} rows of {} are missing at the destination", diff.len(), table);

        if request.dry_run {
            return Ok(report);
        }

        report.rows_written = execute_transfer(
            destination,
            &plan,
            &diff,
            mode,
            self.settings.bulk_batch_size,
        )
        .await?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = SyncRequest::new("acme", "globex", "orders", "public");
        assert!(request.bulk_insert);
        assert!(!request.dry_run);
        assert_eq!(request.transfer_mode(), TransferMode::Bulk);
        assert_eq!(request.extract_options(), ExtractOptions::default());
        assert_eq!(request.table_identity(), TableIdentity::new("public", "orders"));
    }

    #[test]
    fn test_request_builders() {
        let request = SyncRequest::new("a", "b", "orders", "public")
            .with_bulk_insert(false)
            .with_key_columns(vec!["id".to_string()])
            .with_where("total > 0")
            .with_order_by("id")
            .with_top(5)
            .with_dry_run(true);

        assert_eq!(request.transfer_mode(), TransferMode::RowByRow);
        assert_eq!(request.key_columns.as_deref(), Some(["id".to_string()].as_slice()));
        let options = request.extract_options();
        assert_eq!(options.where_clause.as_deref(), Some("total > 0"));
        assert_eq!(options.order_by.as_deref(), Some("id"));
        assert_eq!(options.top, Some(5));
        assert!(request.dry_run);
    }
}
