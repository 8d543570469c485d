//! Configuration validation.

use super::{Config, EndpointConfig};
use crate::error::{CheckError, Result};
use std::path::Path;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_endpoint(&config.databases.src, "databases.src")?;
    validate_endpoint(&config.databases.tgt, "databases.tgt")?;

    if config.performance.thread_count == 0 {
        return Err(CheckError::Config(
            "performance.thread_count must be at least 1".into(),
        ));
    }

    let scope = &config.check_scope;
    if scope.tables.is_empty() && scope.schemas.is_empty() && scope.custom_sqls.is_empty() {
        return Err(CheckError::Config(
            "check_scope must declare at least one table, schema or custom SQL".into(),
        ));
    }

    for custom in &scope.custom_sqls {
        if custom.name.trim().is_empty() {
            return Err(CheckError::Config(
                "check_scope.custom_sqls entries require a non-empty name".into(),
            ));
        }
    }

    Ok(())
}

fn validate_endpoint(endpoint: &EndpointConfig, prefix: &str) -> Result<()> {
    if endpoint.url.is_empty() {
        return Err(CheckError::Config(format!("{prefix}.url is required")));
    }
    if endpoint.user.is_empty() {
        return Err(CheckError::Config(format!("{prefix}.user is required")));
    }
    if endpoint.password.is_empty() {
        return Err(CheckError::Config(format!("{prefix}.password is required")));
    }
    if let Some(ref locator) = endpoint.driver_jar {
        resolve_driver_locator(locator).ok_or_else(|| {
            CheckError::Config(format!(
                "{prefix}.driver_jar not found: {locator} (also searched in lib/)"
            ))
        })?;
    }
    Ok(())
}

/// Resolve a driver locator hint against the current directory, then `lib/`.
pub fn resolve_driver_locator(locator: &str) -> Option<std::path::PathBuf> {
    let direct = Path::new(locator);
    if direct.exists() {
        return Some(direct.to_path_buf());
    }
    let in_lib = Path::new("lib").join(locator);
    if in_lib.exists() {
        return Some(in_lib);
    }
    None
}
