// ABOUTME: TransferPlan - the per-call bundle of statement, column lists and keys
// ABOUTME: Built once after reconciliation, key resolution and key extraction

use crate::driver::TableIdentity;
use crate::row::Value;
use crate::sync::columns::ColumnReconciliation;
use crate::sync::keys::KeySet;
use crate::sync::query::{build_source_select, ExtractOptions, SelectStatement};

#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub table: TableIdentity,
    pub select: SelectStatement,
    pub source_columns: Vec<String>,
    pub destination_columns: Vec<String>,
    pub keys: KeySet,
}

impl TransferPlan {
    pub fn build(
        table: &TableIdentity,
        columns: ColumnReconciliation,
        keys: KeySet,
        options: &ExtractOptions,
        destination_keys: &[Vec<Value>],
    ) -> Self {
        let select = build_source_select(table, &columns.source, &keys, options, destination_keys);
        Self {
            table: table.clone(),
            select,
            source_columns: columns.source,
            destination_columns: columns.destination,
            keys,
        }
    }
}
