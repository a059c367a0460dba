// ABOUTME: Key resolution - which columns identify a row across tenants
// ABOUTME: Explicit keys win; otherwise the destination primary key is discovered

use crate::driver::{Connection, TableIdentity};
use crate::error::Result;

/// Where the key columns came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    PrimaryKey,
}

/// Columns used for row-identity comparison.
///
/// An empty set is a degenerate state that is carried through rather than
/// rejected: no key match can ever succeed, so every source row diffs as new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    columns: Vec<String>,
    source: KeySource,
}

impl KeySet {
    pub fn explicit(columns: Vec<String>) -> Self {
        Self {
            columns,
            source: KeySource::Explicit,
        }
    }

    pub fn primary_key(columns: Vec<String>) -> Self {
        Self {
            columns,
            source: KeySource::PrimaryKey,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
}

/// Resolve the key set for `table`.
///
/// Explicit columns are used verbatim and are not checked against the
/// destination's real primary key.
pub async fn resolve_keys<C: Connection>(
    explicit: Option<&[String]>,
    destination: &mut C,
    table: &TableIdentity,
) -> Result<KeySet> {
    let keys = match explicit {
        Some(columns) => KeySet::explicit(columns.to_vec()),
        None => KeySet::primary_key(destination.primary_key_columns(table).await?),
    };

    if keys.is_empty() {
        tracing::warn!(
            "No key columns for {}: every source row will be treated as new",
            table
        );
    } else {
        tracing::info!(
            "Using {:?} key columns for {}: {:?}",
            keys.source(),
            table,
            keys.columns()
        );
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_set_accessors() {
        let keys = KeySet::explicit(vec!["order_id".to_string(), "line".to_string()]);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.source(), KeySource::Explicit);
        assert!(!keys.is_empty());

        let empty = KeySet::primary_key(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.source(), KeySource::PrimaryKey);
    }
}
