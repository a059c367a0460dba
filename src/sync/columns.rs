// ABOUTME: Column reconciliation - intersects source and destination catalogs
// ABOUTME: Drops identity, generated and row-version columns; extra columns are ignored

use crate::config::SyncSettings;
use crate::driver::{ColumnInfo, Connection, TableIdentity};
use crate::error::Result;

/// Columns both sides can exchange, in each side's catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReconciliation {
    /// Matched columns in source catalog order (projection + bulk buffer layout)
    pub source: Vec<String>,
    /// Matched columns in destination catalog order (insert column list)
    pub destination: Vec<String>,
}

impl ColumnReconciliation {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Filter catalog columns down to the ones that can be copied.
///
/// Identity and generated columns are filled in by the destination, and
/// row-version surrogates are maintained by the server, so none of them are
/// ever written.
pub fn usable_columns(columns: &[ColumnInfo], settings: &SyncSettings) -> Vec<String> {
    columns
        .iter()
        .filter(|c| !c.is_identity && !c.is_generated)
        .filter(|c| !settings.is_row_version_type(&c.data_type))
        .map(|c| c.name.clone())
        .collect()
}

/// Keep the columns of `primary` that also appear in `other`, in `primary`'s order.
pub fn intersect_columns(primary: &[String], other: &[String]) -> Vec<String> {
    primary
        .iter()
        .filter(|c| other.contains(c))
        .cloned()
        .collect()
}

/// Fetch both catalogs and intersect their usable columns.
///
/// Fails with `InvalidArgument` before touching either connection when the
/// table or schema name is empty.
pub async fn reconcile_columns<S, D>(
    source: &mut S,
    destination: &mut D,
    table: &TableIdentity,
    settings: &SyncSettings,
) -> Result<ColumnReconciliation>
where
    S: Connection,
    D: Connection,
{
    table.validate()?;

    let source_catalog = source.table_columns(table).await?;
    let destination_catalog = destination.table_columns(table).await?;

    let source_usable = usable_columns(&source_catalog, settings);
    let destination_usable = usable_columns(&destination_catalog, settings);

    let matched_source = intersect_columns(&source_usable, &destination_usable);
    let matched_destination = intersect_columns(&destination_usable, &source_usable);

    let dropped: Vec<&str> = source_catalog
        .iter()
        .chain(destination_catalog.iter())
        .map(|c| c.name.as_str())
        .filter(|name| !matched_source.iter().any(|m| m == name))
        .collect();
    if !dropped.is_empty() {
        tracing::debug!("Columns of {} not synchronized: {:?}", table, dropped);
    }

    tracing::debug!(
        "Reconciled {} columns for {}: {:?}",
        matched_source.len(),
        table,
        matched_source
    );

    Ok(ColumnReconciliation {
        source: matched_source,
        destination: matched_destination,
    })
}
