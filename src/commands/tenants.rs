// ABOUTME: `tenants` command - list configured tenant codes
// ABOUTME: Inline URLs are shown with the password redacted; env-backed ones by variable name

use anyhow::Result;
use std::path::Path;

use crate::commands::load_config;
use crate::config::Config;
use crate::utils::redact_url;

/// One `code  target` line per configured tenant, in code order.
pub fn tenant_lines(config: &Config) -> Vec<String> {
    config
        .tenants
        .iter()
        .map(|(code, tenant)| {
            let target = match (&tenant.url, &tenant.url_env) {
                (Some(url), _) => redact_url(url),
                (None, Some(var)) => format!("${}", var),
                (None, None) => "(unset)".to_string(),
            };
            format!("{}\t{}", code, target)
        })
        .collect()
}

pub fn tenants(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let lines = tenant_lines(&config);
    if lines.is_empty() {
        println!("No tenants configured.");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
