// ABOUTME: CLI entry point for tenant-sync
// ABOUTME: Parses commands and routes to the sync and tenants handlers

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tenant_sync::commands;

#[derive(Parser)]
#[command(name = "tenant-sync")]
#[command(about = "Copy rows missing at a destination tenant database from a source tenant", long_about = None)]
#[command(version)]
struct Cli {
    /// Allow self-signed TLS certificates (insecure - use only for testing)
    #[arg(
        long = "allow-self-signed-certs",
        global = true,
        default_value_t = false
    )]
    allow_self_signed_certs: bool,
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    /// Path to tenant-sync.toml (defaults to ./tenant-sync.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy source rows whose keys are missing at the destination
    Sync {
        /// Source tenant code
        #[arg(long)]
        source: String,
        /// Destination tenant code
        #[arg(long)]
        destination: String,
        /// Table to synchronize
        #[arg(long)]
        table: String,
        #[arg(long, default_value = "public")]
        schema: String,
        /// Key columns (comma-separated); defaults to the destination primary key
        #[arg(long = "key", value_delimiter = ',')]
        keys: Option<Vec<String>>,
        /// Insert one row at a time instead of bulk loading
        #[arg(long)]
        row_by_row: bool,
        /// SQL predicate appended to the source query (trusted, inserted verbatim)
        #[arg(long = "where")]
        where_clause: Option<String>,
        /// ORDER BY fragment for the source query (trusted, inserted verbatim)
        #[arg(long)]
        order_by: Option<String>,
        /// Fetch at most this many source rows
        #[arg(long)]
        top: Option<u64>,
        /// In-memory filter over fetched rows, column=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Diff only; write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// List configured tenants
    Tenants,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // 1. RUST_LOG environment variable has highest precedence
    // 2. --log flag is used if RUST_LOG is not set
    // 3. Default to "info" if neither are provided
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tenant_sync::postgres::init_tls_policy(cli.allow_self_signed_certs);

    match cli.command {
        Commands::Sync {
            source,
            destination,
            table,
            schema,
            keys,
            row_by_row,
            where_clause,
            order_by,
            top,
            filters,
            dry_run,
        } => {
            commands::sync(commands::SyncOptions {
                config_path: cli.config,
                source,
                destination,
                table,
                schema,
                keys,
                row_by_row,
                where_clause,
                order_by,
                top,
                filters,
                dry_run,
            })
            .await?;
            Ok(())
        }
        Commands::Tenants => commands::tenants(cli.config.as_deref()),
    }
}
