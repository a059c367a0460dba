// ABOUTME: PostgreSQL connection establishment with a process-wide TLS policy
// ABOUTME: Single attempt only - no retry, no timeout beyond what the URL configures

use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::sync::OnceLock;
use tokio::task::JoinHandle;
use tokio_postgres::Client;

use crate::error::Result;

static ALLOW_SELF_SIGNED: OnceLock<bool> = OnceLock::new();

/// Set whether self-signed server certificates are accepted.
///
/// Only the first call has an effect; call it once at startup.
pub fn init_tls_policy(allow_self_signed: bool) {
    if ALLOW_SELF_SIGNED.set(allow_self_signed).is_err() {
        tracing::debug!("TLS policy already initialised, ignoring");
    }
}

fn allow_self_signed() -> bool {
    ALLOW_SELF_SIGNED.get().copied().unwrap_or(false)
}

fn make_tls() -> Result<MakeTlsConnector> {
    let allow = allow_self_signed();
    if allow {
        tracing::warn!("Accepting self-signed certificates (insecure)");
    }
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(allow)
        .danger_accept_invalid_hostnames(allow)
        .build()?;
    Ok(MakeTlsConnector::new(connector))
}

/// Open a connection and spawn its driver task.
///
/// The returned handle completes once the client is dropped, which is how
/// callers release the connection deterministically.
pub async fn connect(url: &str) -> Result<(Client, JoinHandle<()>)> {
    let tls = make_tls()?;
    let (client, connection) = tokio_postgres::connect(url, tls).await?;

    let task = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("PostgreSQL connection error: {}", e);
        }
    });

    Ok((client, task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_tls_builds_connector() {
        assert!(make_tls().is_ok());
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let err = connect("not-a-valid-url").await.unwrap_err();
        assert!(matches!(err, crate::error::SyncError::DataAccess(_)));
    }
}
