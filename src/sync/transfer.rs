// ABOUTME: Transfer executor - writes the diff set to the destination
// ABOUTME: Bulk path loads a text buffer in fixed batches; row path inserts one row at a time

use std::fmt;

use crate::driver::{ColumnMapping, Connection};
use crate::error::Result;
use crate::row::Row;
use crate::sync::materialize::TabularBuffer;
use crate::sync::plan::TransferPlan;
use crate::sync::query::InsertStatement;

/// Which write strategy to use for the diff set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Bulk,
    RowByRow,
}

impl TransferMode {
    pub fn from_bulk_flag(bulk_insert: bool) -> Self {
        if bulk_insert {
            TransferMode::Bulk
        } else {
            TransferMode::RowByRow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Bulk => "bulk",
            TransferMode::RowByRow => "row-by-row",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write `rows` to the destination table of `plan`.
///
/// An empty diff is a no-op: the destination is not touched. Nothing here
/// retries or rolls back; on the row-by-row path the first failing insert
/// aborts the rest and earlier inserts stay committed.
///
/// # Returns
///
/// The number of rows written.
pub async fn execute_transfer<C: Connection>(
    destination: &mut C,
    plan: &TransferPlan,
    rows: &[Row],
    mode: TransferMode,
    batch_size: usize,
) -> Result<u64> {
    if rows.is_empty() {
        tracing::debug!("Nothing to transfer into {}", plan.table);
        return Ok(0);
    }

    tracing::info!(
        "Writing {} rows into {} ({})",
        rows.len(),
        plan.table,
        mode
    );

    match mode {
        TransferMode::Bulk => bulk_copy(destination, plan, rows, batch_size).await,
        TransferMode::RowByRow => copy_one_by_one(destination, plan, rows).await,
    }
}

async fn bulk_copy<C: Connection>(
    destination: &mut C,
    plan: &TransferPlan,
    rows: &[Row],
    batch_size: usize,
) -> Result<u64> {
    let buffer = TabularBuffer::from_rows(rows, &plan.source_columns)?;

    // Reconciliation intersected both sides, so every destination column has
    // an identically named buffer column.
    let mappings: Vec<ColumnMapping> = plan
        .destination_columns
        .iter()
        .map(|c| ColumnMapping::identical(c))
        .collect();

    destination
        .bulk_load(&buffer, &plan.table, &mappings, batch_size)
        .await
}

async fn copy_one_by_one<C: Connection>(
    destination: &mut C,
    plan: &TransferPlan,
    rows: &[Row],
) -> Result<u64> {
    let mut written = 0u64;
    for row in rows {
        let statement = InsertStatement::for_row(&plan.table, &plan.destination_columns, row);
        written += destination.insert(&statement).await?;
    }
    Ok(written)
}
