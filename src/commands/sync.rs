// ABOUTME: `sync` command - one table from a source tenant to a destination tenant
// ABOUTME: Builds the request from CLI options, runs it and prints the report

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::commands::load_config;
use crate::postgres::PgDriver;
use crate::registry::StaticRegistry;
use crate::sync::{DataSyncer, RowPredicate, SyncReport, SyncRequest};

/// Options collected by the CLI for one synchronization.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub config_path: Option<PathBuf>,
    pub source: String,
    pub destination: String,
    pub table: String,
    pub schema: String,
    pub keys: Option<Vec<String>>,
    pub row_by_row: bool,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u64>,
    /// `column=value` filters, all of which must match
    pub filters: Vec<String>,
    pub dry_run: bool,
}

impl SyncOptions {
    /// Translate the options into an engine request.
    pub fn to_request(&self) -> Result<SyncRequest> {
        let mut request = SyncRequest::new(&self.source, &self.destination, &self.table, &self.schema)
            .with_bulk_insert(!self.row_by_row)
            .with_dry_run(self.dry_run);

        if let Some(keys) = &self.keys {
            request = request.with_key_columns(keys.clone());
        }
        if let Some(where_clause) = &self.where_clause {
            request = request.with_where(where_clause.clone());
        }
        if let Some(order_by) = &self.order_by {
            request = request.with_order_by(order_by.clone());
        }
        if let Some(top) = self.top {
            request = request.with_top(top);
        }

        let predicates = self
            .filters
            .iter()
            .map(|f| RowPredicate::parse_text_equals(f))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Invalid --filter")?;
        match predicates.len() {
            0 => {}
            1 => {
                if let Some(predicate) = predicates.into_iter().next() {
                    request = request.with_predicate(predicate);
                }
            }
            _ => request = request.with_predicate(RowPredicate::all(predicates)),
        }

        Ok(request)
    }
}

/// Run one synchronization and print its report.
pub async fn sync(opts: SyncOptions) -> Result<SyncReport> {
    let config = load_config(opts.config_path.as_deref())?;
    let request = opts.to_request()?;

    let syncer = DataSyncer::new(
        StaticRegistry::from_config(&config),
        PgDriver::new(),
        config.sync.clone(),
    );

    let report = syncer.synchronize(&request).await.with_context(|| {
        format!(
            "Failed to synchronize {}.{} from '{}' to '{}'",
            opts.schema, opts.table, opts.source, opts.destination
        )
    })?;

    print_report(&report);
    Ok(report)
}

fn print_report(report: &SyncReport) {
    println!("Table:            {}", report.table);
    println!("Strategy:         {}", report.mode);
    if report.key_columns.is_empty() {
        println!("Key columns:      (none - every row treated as new)");
    } else {
        println!("Key columns:      {}", report.key_columns.join(", "));
    }
    println!("Columns:          {}", report.columns.join(", "));
    println!("Destination keys: {}", report.destination_keys);
    println!("Source rows:      {}", report.source_rows);
    println!("Filtered out:     {}", report.filtered_out);
    println!("Missing rows:     {}", report.diff_rows);
    if report.dry_run {
        println!("Rows written:     0 (dry run)");
    } else {
        println!("Rows written:     {}", report.rows_written);
    }
    println!("Duration:         {}ms", report.duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{Row, Value};
    use crate::sync::TransferMode;

    fn options() -> SyncOptions {
        SyncOptions {
            source: "acme".to_string(),
            destination: "globex".to_string(),
            table: "orders".to_string(),
            schema: "public".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_to_request_defaults_to_bulk() {
        let request = options().to_request().unwrap();
        assert_eq!(request.transfer_mode(), TransferMode::Bulk);
        assert!(request.predicate.is_none());
        assert!(request.key_columns.is_none());
    }

    #[test]
    fn test_to_request_carries_every_option() {
        let opts = SyncOptions {
            keys: Some(vec!["id".to_string()]),
            row_by_row: true,
            where_clause: Some("total > 0".to_string()),
            order_by: Some("id".to_string()),
            top: Some(10),
            dry_run: true,
            ..options()
        };
        let request = opts.to_request().unwrap();
        assert_eq!(request.transfer_mode(), TransferMode::RowByRow);
        assert_eq!(request.key_columns, Some(vec!["id".to_string()]));
        assert_eq!(request.where_clause.as_deref(), Some("total > 0"));
        assert_eq!(request.order_by.as_deref(), Some("id"));
        assert_eq!(request.top, Some(10));
        assert!(request.dry_run);
    }

    #[test]
    fn test_to_request_combines_filters() {
        let opts = SyncOptions {
            filters: vec!["status=open".to_string(), "region=eu".to_string()],
            ..options()
        };
        let request = opts.to_request().unwrap();
        let predicate = request.predicate.unwrap();

        let open_eu: Row = [("status", Value::from("open")), ("region", Value::from("eu"))]
            .into_iter()
            .collect();
        let open_us: Row = [("status", Value::from("open")), ("region", Value::from("us"))]
            .into_iter()
            .collect();
        assert!(predicate.matches(&open_eu));
        assert!(!predicate.matches(&open_us));
    }

    #[test]
    fn test_to_request_rejects_malformed_filter() {
        let opts = SyncOptions {
            filters: vec!["no-equals-sign".to_string()],
            ..options()
        };
        assert!(opts.to_request().is_err());
    }
}
