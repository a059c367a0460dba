// ABOUTME: Statement construction for source extraction, key extraction and row inserts
// ABOUTME: Identifiers are always quoted; caller WHERE/ORDER BY fragments are inserted verbatim

use std::collections::HashMap;

use crate::driver::TableIdentity;
use crate::row::{Row, Value};
use crate::sync::keys::KeySet;
use crate::utils::{quote_column_list, quote_ident};

/// Caller-supplied shaping of the source extraction.
///
/// `where_clause` and `order_by` are trusted SQL fragments. They are not
/// escaped or validated in any way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u64>,
}

impl ExtractOptions {
    fn where_fragment(&self) -> Option<&str> {
        non_blank(self.where_clause.as_deref())
    }

    fn order_fragment(&self) -> Option<&str> {
        non_blank(self.order_by.as_deref())
    }
}

fn non_blank(fragment: Option<&str>) -> Option<&str> {
    fragment.map(str::trim).filter(|s| !s.is_empty())
}

/// A SELECT over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    pub table: TableIdentity,
    pub columns: Vec<String>,
    /// Complete WHERE condition, without the keyword
    pub filter: Option<String>,
    /// ORDER BY fragment, without the keyword
    pub order_by: Option<String>,
    pub limit: Option<u64>,
}

impl SelectStatement {
    pub fn to_sql(&self) -> String {
        self.to_sql_with_text_columns(&[])
    }

    /// Same as [`to_sql`](Self::to_sql), except that columns named in
    /// `as_text` are read as `"col"::text AS "col"`.
    pub fn to_sql_with_text_columns(&self, as_text: &[String]) -> String {
        let projection: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let quoted = quote_ident(column);
                if as_text.contains(column) {
                    format!("{0}::text AS {0}", quoted)
                } else {
                    quoted
                }
            })
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            projection.join(", "),
            self.table.quoted()
        );
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }
}

/// A single-row parameterized INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: TableIdentity,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl InsertStatement {
    /// Bind `row`'s values to `columns`; columns the row lacks are bound as NULL.
    pub fn for_row(table: &TableIdentity, columns: &[String], row: &Row) -> Self {
        Self {
            table: table.clone(),
            columns: columns.to_vec(),
            values: row.project(columns),
        }
    }

    /// Generates:
    /// ```sql
    /// INSERT INTO "schema"."table" ("col1", "col2") VALUES ($1, $2)
    /// ```
    pub fn to_sql(&self) -> String {
        self.to_sql_with_casts(&HashMap::new())
    }

    /// Placeholders of columns found in `casts` are sent as text and cast
    /// to the mapped (already quoted) type: `$2::text::"public"."mood"`.
    pub fn to_sql_with_casts(&self, casts: &HashMap<String, String>) -> String {
        let placeholders: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| match casts.get(column) {
                Some(type_ref) => format!("${}::text::{}", i + 1, type_ref),
                None => format!("${}", i + 1),
            })
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.quoted(),
            quote_column_list(&self.columns),
            placeholders.join(", ")
        )
    }
}

/// Reconciled columns plus any key columns they lack, so every fetched row
/// carries its key for the diff.
pub fn projection_columns(columns: &[String], keys: &KeySet) -> Vec<String> {
    let mut projection = columns.to_vec();
    for key in keys.columns() {
        if !projection.contains(key) {
            projection.push(key.clone());
        }
    }
    projection
}

/// Render "the source key is not among the destination keys" as a WHERE condition.
///
/// Destination tuples containing NULL can never match and are skipped. A
/// source row with a NULL key component always passes, matching the diff's
/// null-never-matches rule. Returns `None` when there is nothing to exclude.
///
/// Single-column key:
/// ```sql
/// ("id" IS NULL OR "id" NOT IN (1, 2))
/// ```
///
/// Composite key:
/// ```sql
/// ("a" IS NULL OR "b" IS NULL OR ("a", "b") NOT IN ((1, 'x'), (2, 'y')))
/// ```
pub fn build_exclusion(keys: &KeySet, destination_keys: &[Vec<Value>]) -> Option<String> {
    if keys.is_empty() {
        return None;
    }

    let single = keys.len() == 1;
    let tuples: Vec<String> = destination_keys
        .iter()
        .filter(|tuple| tuple.len() == keys.len() && !tuple.iter().any(Value::is_null))
        .map(|tuple| {
            let literals: Vec<String> = tuple.iter().map(Value::to_sql_literal).collect();
            if single {
                literals.join(", ")
            } else {
                format!("({})", literals.join(", "))
            }
        })
        .collect();

    if tuples.is_empty() {
        return None;
    }

    let null_checks: Vec<String> = keys
        .columns()
        .iter()
        .map(|k| format!("{} IS NULL", quote_ident(k)))
        .collect();
    let key_expr = if single {
        quote_ident(&keys.columns()[0])
    } else {
        format!("({})", quote_column_list(keys.columns()))
    };

    Some(format!(
        "({} OR {} NOT IN ({}))",
        null_checks.join(" OR "),
        key_expr,
        tuples.join(", ")
    ))
}

/// Build the source extraction statement.
///
/// The key exclusion is only added when the caller also supplied a WHERE
/// fragment; without one the whole source table is fetched and the diff
/// alone decides what is new.
pub fn build_source_select(
    table: &TableIdentity,
    columns: &[String],
    keys: &KeySet,
    options: &ExtractOptions,
    destination_keys: &[Vec<Value>],
) -> SelectStatement {
    let filter = options.where_fragment().map(|where_clause| {
        match build_exclusion(keys, destination_keys) {
            Some(exclusion) => format!("{} AND ({})", exclusion, where_clause),
            None => format!("({})", where_clause),
        }
    });

    SelectStatement {
        table: table.clone(),
        columns: projection_columns(columns, keys),
        filter,
        order_by: options.order_fragment().map(str::to_string),
        limit: options.top,
    }
}

/// Build the unfiltered destination key extraction.
pub fn build_key_select(table: &TableIdentity, keys: &KeySet) -> SelectStatement {
    SelectStatement {
        table: table.clone(),
        columns: keys.columns().to_vec(),
        filter: None,
        order_by: None,
        limit: None,
    }
}
