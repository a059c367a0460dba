// ABOUTME: PostgreSQL implementation of the Driver and Connection seams
// ABOUTME: Catalog lookups, SELECT/INSERT execution and COPY-based bulk loading

use async_trait::async_trait;
use futures::SinkExt;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

use super::connection::connect;
use super::copy::{copy_statement, encode_rows, mapping_indices};
use super::types::{decode_row, travels_as_text};
use crate::driver::{ColumnInfo, ColumnMapping, Connection, Driver, TableIdentity};
use crate::error::Result;
use crate::registry::ConnectionDescriptor;
use crate::row::Row;
use crate::sync::materialize::TabularBuffer;
use crate::sync::query::{InsertStatement, SelectStatement};
use crate::utils::quote_ident;

/// Opens one `tokio_postgres` connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDriver;

impl PgDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for PgDriver {
    type Connection = PgConnection;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<PgConnection> {
        tracing::debug!("Connecting to {}", descriptor);
        let (client, task) = connect(&descriptor.url).await?;
        Ok(PgConnection {
            client,
            task,
            tenant: descriptor.tenant.clone(),
            catalog: HashMap::new(),
        })
    }
}

/// A live connection plus the task driving it.
pub struct PgConnection {
    client: Client,
    task: JoinHandle<()>,
    tenant: String,
    catalog: HashMap<TableIdentity, Vec<CatalogColumn>>,
}

#[derive(Debug, Clone)]
struct CatalogColumn {
    info: ColumnInfo,
    /// Quoted `"schema"."type"`, the domain itself for domain columns
    type_ref: String,
    as_text: bool,
}

impl PgConnection {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    async fn load_catalog(&self, table: &TableIdentity) -> Result<Vec<CatalogColumn>> {
        let rows = self
            .client
            .query(
                "SELECT column_name::text, data_type::text, is_identity::text, is_generated::text,
                        COALESCE(domain_schema, udt_schema)::text,
                        COALESCE(domain_name, udt_name)::text,
                        domain_name IS NOT NULL
                 FROM information_schema.columns
                 WHERE table_schema = $1 AND table_name = $2
                 ORDER BY ordinal_position",
                &[&table.schema, &table.table],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let data_type: String = row.get(1);
                let is_identity: String = row.get(2);
                let is_generated: String = row.get(3);
                let type_schema: String = row.get(4);
                let type_name: String = row.get(5);
                let is_domain: bool = row.get(6);
                CatalogColumn {
                    as_text: travels_as_text(&data_type, is_domain),
                    type_ref: format!("{}.{}", quote_ident(&type_schema), quote_ident(&type_name)),
                    info: ColumnInfo {
                        name: row.get(0),
                        data_type,
                        is_identity: is_identity == "YES",
                        is_generated: is_generated == "ALWAYS",
                    },
                }
            })
            .collect())
    }

    /// Catalog of `table`, loaded once per connection.
    async fn catalog(&mut self, table: &TableIdentity) -> Result<&[CatalogColumn]> {
        if !self.catalog.contains_key(table) {
            let columns = self.load_catalog(table).await?;
            self.catalog.insert(table.clone(), columns);
        }
        Ok(self.catalog.get(table).map(Vec::as_slice).unwrap_or_default())
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn table_columns(&mut self, table: &TableIdentity) -> Result<Vec<ColumnInfo>> {
        let columns = self.load_catalog(table).await?;
        let infos = columns.iter().map(|c| c.info.clone()).collect();
        self.catalog.insert(table.clone(), columns);
        Ok(infos)
    }

    async fn primary_key_columns(&mut self, table: &TableIdentity) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT a.attname::text
                 FROM pg_index i
                 JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
                 JOIN pg_class c ON c.oid = i.indrelid
                 JOIN pg_namespace n ON n.oid = c.relnamespace
                 WHERE i.indisprimary
                   AND n.nspname = $1
                   AND c.relname = $2
                 ORDER BY array_position(i.indkey, a.attnum)",
                &[&table.schema, &table.table],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn select(&mut self, statement: &SelectStatement) -> Result<Vec<Row>> {
        let as_text: Vec<String> = self
            .catalog(&statement.table)
            .await?
            .iter()
            .filter(|c| c.as_text)
            .map(|c| c.info.name.clone())
            .collect();
        if !as_text.is_empty() {
            tracing::debug!("Reading {:?} of {} as text", as_text, statement.table);
        }
        let sql = statement.to_sql_with_text_columns(&as_text);
        let rows = self.client.query(sql.as_str(), &[]).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64> {
        let casts: HashMap<String, String> = self
            .catalog(&statement.table)
            .await?
            .iter()
            .filter(|c| c.as_text)
            .map(|c| (c.info.name.clone(), c.type_ref.clone()))
            .collect();
        let params: Vec<&(dyn ToSql + Sync)> = statement
            .values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();
        let affected = self
            .client
            .execute(statement.to_sql_with_casts(&casts).as_str(), &params)
            .await?;
        Ok(affected)
    }

    async fn bulk_load(
        &mut self,
        buffer: &TabularBuffer,
        table: &TableIdentity,
        mappings: &[ColumnMapping],
        batch_size: usize,
    ) -> Result<u64> {
        let indices = mapping_indices(buffer, mappings)?;
        let destination_columns: Vec<String> =
            mappings.iter().map(|m| m.destination.clone()).collect();
        let statement = copy_statement(table, &destination_columns);

        let mut loaded = 0u64;
        for (n, batch) in buffer.rows().chunks(batch_size.max(1)).enumerate() {
            let data = encode_rows(batch, &indices);
            let sink = self.client.copy_in(statement.as_str()).await?;
            tokio::pin!(sink);
            sink.send(data.freeze()).await?;
            let copied = sink.finish().await?;
            tracing::debug!("COPY batch {} into {}: {} rows", n + 1, table, copied);
            loaded += copied;
        }

        Ok(loaded)
    }

    async fn close(self) {
        drop(self.client);
        if let Err(e) = self.task.await {
            tracing::warn!("Connection task for {} ended abnormally: {}", self.tenant, e);
        }
    }
}
