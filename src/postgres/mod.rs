// ABOUTME: PostgreSQL driver - connections, type mapping and COPY loading
// ABOUTME: The only module that talks to tokio_postgres directly

pub mod connection;
pub mod copy;
pub mod driver;
pub mod types;

pub use connection::{connect, init_tls_policy};
pub use driver::{PgConnection, PgDriver};
