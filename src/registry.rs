// ABOUTME: Tenant code to connection resolution
// ABOUTME: StaticRegistry serves descriptors from the [tenants] table of the config file

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{Config, TenantConfig};
use crate::error::{Result, SyncError};
use crate::utils::redact_url;

/// Everything a driver needs to open a connection for one tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub tenant: String,
    pub url: String,
}

impl ConnectionDescriptor {
    pub fn new(tenant: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            url: url.into(),
        }
    }

    /// URL with the password replaced, safe for logs.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("tenant", &self.tenant)
            .field("url", &self.redacted_url())
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tenant, self.redacted_url())
    }
}

/// Resolves tenant codes to connection descriptors.
pub trait ConnectionRegistry: Send + Sync {
    /// Fails with [`SyncError::NotFound`] for unknown tenant codes.
    fn resolve(&self, tenant_code: &str) -> Result<ConnectionDescriptor>;
}

/// Registry backed by a fixed tenant table.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    tenants: BTreeMap<String, TenantConfig>,
}

impl StaticRegistry {
    pub fn new(tenants: BTreeMap<String, TenantConfig>) -> Self {
        Self { tenants }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tenants.clone())
    }

    /// Register a tenant with an inline URL.
    pub fn with_tenant(mut self, code: impl Into<String>, url: impl Into<String>) -> Self {
        self.tenants.insert(
            code.into(),
            TenantConfig {
                url: Some(url.into()),
                url_env: None,
            },
        );
        self
    }

    pub fn tenant_codes(&self) -> Vec<&str> {
        self.tenants.keys().map(|s| s.as_str()).collect()
    }
}

impl ConnectionRegistry for StaticRegistry {
    fn resolve(&self, tenant_code: &str) -> Result<ConnectionDescriptor> {
        let tenant = self
            .tenants
            .get(tenant_code)
            .ok_or_else(|| SyncError::not_found(format!("unknown tenant '{}'", tenant_code)))?;

        let url = match (&tenant.url, &tenant.url_env) {
            (Some(url), _) => url.clone(),
            (None, Some(var)) => std::env::var(var).map_err(|_| {
                SyncError::not_found(format!(
                    "environment variable '{}' for tenant '{}' is not set",
                    var, tenant_code
                ))
            })?,
            (None, None) => {
                return Err(SyncError::invalid_argument(format!(
                    "tenant '{}' has no connection URL",
                    tenant_code
                )))
            }
        };

        Ok(ConnectionDescriptor::new(tenant_code, url))
    }
}
