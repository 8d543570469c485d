//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source and target connection parameters.
    pub databases: DatabasesConfig,

    /// Worker budget.
    #[serde(default)]
    pub performance: PerformanceConfig,

    /// What to check.
    #[serde(default)]
    pub check_scope: CheckScope,
}

/// Connection parameters for both engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasesConfig {
    /// Oracle-family source.
    pub src: EndpointConfig,

    /// PostgreSQL-compatible target.
    pub tgt: EndpointConfig,
}

/// Connection parameters for a single engine.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Connect string. Oracle descriptor (`//host:1521/service`) for the
    /// source, libpq URL or key-value string for the target.
    pub url: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Optional driver locator hint, resolved against the current directory
    /// then `lib/`. Validated at load so a misconfigured deployment fails
    /// before any connection is attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_jar: Option<String>,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("driver_jar", &self.driver_jar)
            .finish()
    }
}

/// Worker budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Total worker budget across both engine pools. Each pool gets
    /// `max(1, thread_count / 2)` workers.
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
        }
    }
}

/// Declared comparison workload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckScope {
    /// Source-schema to target-schema rewrites, case-insensitive.
    #[serde(default)]
    pub schema_mapping: HashMap<String, String>,

    /// Schemas to auto-expand into tables via the source catalog.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Explicit `schema.table` or bare `table` entries.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Exclusion patterns: exact case-insensitive match or `*` wildcard,
    /// anchored over the fully-qualified name.
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Ad-hoc queries compared verbatim.
    #[serde(default)]
    pub custom_sqls: Vec<CustomSql>,
}

/// A named ad-hoc query; the name becomes the `CUSTOM:` task-key suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomSql {
    pub name: String,
    pub sql: String,
}

fn default_thread_count() -> usize {
    4
}
