// ABOUTME: Key-diffing table synchronization between tenant databases
// ABOUTME: Reconcile columns, resolve keys, build statements, diff, then transfer

pub mod columns;
pub mod diff;
pub mod engine;
pub mod keys;
pub mod materialize;
pub mod plan;
pub mod predicate;
pub mod query;
pub mod transfer;

pub use columns::{intersect_columns, reconcile_columns, usable_columns, ColumnReconciliation};
pub use diff::{diff_rows, KeyIndex};
pub use engine::{DataSyncer, SyncReport, SyncRequest};
pub use keys::{resolve_keys, KeySet, KeySource};
pub use materialize::TabularBuffer;
pub use plan::TransferPlan;
pub use predicate::{apply_predicate, RowPredicate};
pub use query::{
    build_exclusion, build_key_select, build_source_select, ExtractOptions, InsertStatement,
    SelectStatement,
};
pub use transfer::{execute_transfer, TransferMode};
