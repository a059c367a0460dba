// ABOUTME: Key-tuple diff between fetched source rows and destination keys
// ABOUTME: Hash index over destination tuples; NULL key components never match

use std::collections::HashSet;

use crate::row::{Row, Value};
use crate::sync::keys::KeySet;

/// Destination key tuples indexed for O(1) membership checks.
#[derive(Debug, Default)]
pub struct KeyIndex {
    tuples: HashSet<Vec<Value>>,
}

impl KeyIndex {
    /// Index positional key tuples (ordered as the key set).
    ///
    /// Tuples containing NULL are dropped: a source row with a NULL key
    /// component never matches, and a non-NULL source value never equals NULL.
    pub fn from_tuples(tuples: impl IntoIterator<Item = Vec<Value>>) -> Self {
        let tuples = tuples
            .into_iter()
            .filter(|tuple| !tuple.iter().any(Value::is_null))
            .collect();
        Self { tuples }
    }

    /// Index the key columns of fetched destination rows.
    pub fn from_rows(rows: &[Row], keys: &KeySet) -> Self {
        Self::from_tuples(rows.iter().map(|row| row.project(keys.columns())))
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Whether `row`'s key tuple is present.
    ///
    /// Always false for an empty key set or a row with a NULL (or missing) key component.
    pub fn contains_row(&self, row: &Row, keys: &KeySet) -> bool {
        if keys.is_empty() {
            return false;
        }
        let tuple = row.project(keys.columns());
        if tuple.iter().any(Value::is_null) {
            return false;
        }
        self.tuples.contains(&tuple)
    }
}

/// Keep the source rows whose key tuple is absent from `index`.
///
/// Source order is preserved.
pub fn diff_rows(source: Vec<Row>, index: &KeyIndex, keys: &KeySet) -> Vec<Row> {
    source
        .into_iter()
        .filter(|row| !index.contains_row(row, keys))
        .collect()
}
