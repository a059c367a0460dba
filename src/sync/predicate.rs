// ABOUTME: In-memory row predicate applied to fetched source rows before diffing
// ABOUTME: Never rendered into SQL; server-side filtering uses the WHERE fragment instead

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::row::{Row, Value};

/// A filter evaluated against each fetched source row.
///
/// Rows for which the predicate returns `false` are dropped before the diff
/// and are never written.
#[derive(Clone)]
pub struct RowPredicate {
    description: String,
    test: Arc<dyn Fn(&Row) -> bool + Send + Sync>,
}

impl RowPredicate {
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Keep rows whose `column` equals `value` exactly.
    pub fn column_equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        let description = format!("{} = {}", column, value);
        Self::new(description, move |row| row.get(&column) == Some(&value))
    }

    /// Keep rows whose `column` is present and not NULL.
    pub fn not_null(column: impl Into<String>) -> Self {
        let column = column.into();
        let description = format!("{} IS NOT NULL", column);
        Self::new(description, move |row| {
            row.get(&column).is_some_and(|v| !v.is_null())
        })
    }

    /// Keep rows accepted by every predicate in `predicates`.
    pub fn all(predicates: Vec<RowPredicate>) -> Self {
        let description = predicates
            .iter()
            .map(|p| p.description.as_str())
            .collect::<Vec<_>>()
            .join(" AND ");
        Self::new(description, move |row| predicates.iter().all(|p| p.matches(row)))
    }

    /// Parse a `column=value` filter, comparing the column's text form.
    ///
    /// Text comparison lets a CLI filter match integer, boolean or date
    /// columns without knowing their type up front.
    pub fn parse_text_equals(filter: &str) -> Result<Self> {
        let (column, expected) = filter.split_once('=').ok_or_else(|| {
            SyncError::invalid_argument(format!(
                "filter '{}' must be in the form column=value",
                filter
            ))
        })?;
        let column = column.trim().to_string();
        if column.is_empty() {
            return Err(SyncError::invalid_argument(format!(
                "filter '{}' has an empty column name",
                filter
            )));
        }
        let expected = expected.to_string();
        let description = format!("{} = '{}'", column, expected);
        Ok(Self::new(description, move |row| {
            row.get(&column)
                .and_then(Value::to_text)
                .is_some_and(|text| text == expected)
        }))
    }

    pub fn matches(&self, row: &Row) -> bool {
        (self.test)(row)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RowPredicate")
            .field(&self.description)
            .finish()
    }
}

/// Drop rows the predicate rejects, returning the kept rows and how many were removed.
pub fn apply_predicate(rows: Vec<Row>, predicate: Option<&RowPredicate>) -> (Vec<Row>, usize) {
    match predicate {
        None => (rows, 0),
        Some(predicate) => {
            let before = rows.len();
            let kept: Vec<Row> = rows.into_iter().filter(|r| predicate.matches(r)).collect();
            let removed = before - kept.len();
            (kept, removed)
        }
    }
}
