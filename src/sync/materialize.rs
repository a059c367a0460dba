// ABOUTME: Tabular materializer - rows to a rectangular text buffer for bulk loading
// ABOUTME: Only "value or NULL" survives; the loader coerces text to column types

use crate::error::{Result, SyncError};
use crate::row::Row;

/// A rectangular buffer with one text column per requested source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularBuffer {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl TabularBuffer {
    /// Materialize `rows` over `columns`.
    ///
    /// Values are rendered with [`crate::row::Value::to_text`]; a column the
    /// row lacks becomes NULL, and row entries outside `columns` are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `rows` or `columns` is empty.
    pub fn from_rows(rows: &[Row], columns: &[String]) -> Result<Self> {
        if rows.is_empty() {
            return Err(SyncError::invalid_argument(
                "cannot materialize an empty row set",
            ));
        }
        if columns.is_empty() {
            return Err(SyncError::invalid_argument(
                "cannot materialize without columns",
            ));
        }

        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).and_then(|v| v.to_text()))
                    .collect()
            })
            .collect();

        Ok(Self {
            columns: columns.to_vec(),
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Value;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_rejects_empty_rows() {
        let err = TabularBuffer::from_rows(&[], &cols(&["id"])).unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_empty_columns() {
        let row: Row = [("id", Value::Int(1))].into_iter().collect();
        let err = TabularBuffer::from_rows(&[row], &[]).unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[test]
    fn test_rectangular_text_layout() {
        let rows: Vec<Row> = vec![
            [
                ("id", Value::Int(1)),
                ("paid", Value::Bool(true)),
                ("extra", Value::from("ignored")),
            ]
            .into_iter()
            .collect(),
            [("id", Value::Int(2)), ("paid", Value::Null)]
                .into_iter()
                .collect(),
            [("id", Value::Int(3))].into_iter().collect(),
        ];

        let buffer = TabularBuffer::from_rows(&rows, &cols(&["id", "paid"])).unwrap();

        assert_eq!(buffer.columns(), cols(&["id", "paid"]).as_slice());
        assert_eq!(buffer.row_count(), 3);
        assert_eq!(
            buffer.rows()[0],
            vec![Some("1".to_string()), Some("true".to_string())]
        );
        assert_eq!(buffer.rows()[1], vec![Some("2".to_string()), None]);
        assert_eq!(buffer.rows()[2], vec![Some("3".to_string()), None]);
        assert_eq!(buffer.column_index("paid"), Some(1));
        assert_eq!(buffer.column_index("extra"), None);
    }
}
