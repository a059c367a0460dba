// ABOUTME: COPY FROM STDIN text-format encoding of a tabular buffer
// ABOUTME: Tab separated, \N for NULL, backslash escapes for control characters

use bytes::{BufMut, BytesMut};

use crate::driver::{ColumnMapping, TableIdentity};
use crate::error::{Result, SyncError};
use crate::sync::materialize::TabularBuffer;
use crate::utils::quote_column_list;

/// `COPY "schema"."table" ("a", "b") FROM STDIN`
pub fn copy_statement(table: &TableIdentity, columns: &[String]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN",
        table.quoted(),
        quote_column_list(columns)
    )
}

/// Resolve each mapping's source column to its position in `buffer`.
pub fn mapping_indices(buffer: &TabularBuffer, mappings: &[ColumnMapping]) -> Result<Vec<usize>> {
    mappings
        .iter()
        .map(|m| {
            buffer.column_index(&m.source).ok_or_else(|| {
                SyncError::invalid_argument(format!(
                    "mapped column '{}' is not in the buffer",
                    m.source
                ))
            })
        })
        .collect()
}

/// Encode `rows`, emitting only the buffer columns at `indices`, in that order.
pub fn encode_rows(rows: &[Vec<Option<String>>], indices: &[usize]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(rows.len() * indices.len() * 8);
    for row in rows {
        for (n, &idx) in indices.iter().enumerate() {
            if n > 0 {
                buf.put_u8(b'\t');
            }
            match row.get(idx).and_then(|v| v.as_deref()) {
                Some(text) => escape_into(text, &mut buf),
                None => buf.put_slice(b"\\N"),
            }
        }
        buf.put_u8(b'\n');
    }
    buf
}

fn escape_into(text: &str, buf: &mut BytesMut) {
    for byte in text.bytes() {
        match byte {
            b'\\' => buf.put_slice(b"\\\\"),
            b'\t' => buf.put_slice(b"\\t"),
            b'\n' => buf.put_slice(b"\\n"),
            b'\r' => buf.put_slice(b"\\r"),
            other => buf.put_u8(other),
        }
    }
}
