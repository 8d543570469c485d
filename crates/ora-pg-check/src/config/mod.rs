//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::resolve_driver_locator;

use crate::error::{CheckError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a file.
    ///
    /// Automatically detects the format based on file extension:
    /// - `.json` files are parsed as JSON
    /// - `.yaml` or `.yml` files are parsed as YAML
    /// - Other extensions default to YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CheckError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| CheckError::Config(format!("Failed to parse JSON config: {}", e)))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Drop custom SQL entries with empty statements and trim the rest.
    fn normalized(mut self) -> Self {
        self.check_scope.custom_sqls.retain_mut(|custom| {
            custom.sql = custom.sql.trim().to_string();
            !custom.sql.is_empty()
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_YAML: &str = r#"
databases:
  src:
    url: "//ora-host:1521/ORCL"
    user: system
    password: secret
  tgt:
    url: "host=pg-host port=5432 dbname=target"
    user: postgres
    password: secret

performance:
  thread_count: 8

check_scope:
  schema_mapping:
    HR: hr_app
  schemas:
    - HR
  tables:
    - HR.EMP
    - regions
  exclude_tables:
    - "HR.TMP_*"
  custom_sqls:
    - name: yesterday
      sql: "SELECT sysdate-1 AS d FROM dual"
    - name: blank
      sql: "   "
"#;

    const VALID_JSON: &str = r#"{
  "databases": {
    "src": {"url": "//ora-host:1521/ORCL", "user": "system", "password": "secret"},
    "tgt": {"url": "host=pg-host port=5432 dbname=target", "user": "postgres", "password": "secret"}
  },
  "check_scope": {
    "tables": ["HR.EMP"]
  }
}"#;

    #[test]
    fn test_from_yaml_valid() {
        let config = Config::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.databases.src.user, "system");
        assert_eq!(config.performance.thread_count, 8);
        assert_eq!(config.check_scope.tables.len(), 2);
        assert_eq!(config.check_scope.schema_mapping["HR"], "hr_app");
    }

    #[test]
    fn test_blank_custom_sql_dropped_on_load() {
        let config = Config::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.check_scope.custom_sqls.len(), 1);
        assert_eq!(config.check_scope.custom_sqls[0].name, "yesterday");
    }

    #[test]
    fn test_from_json_valid() {
        let config = Config::from_json(VALID_JSON).unwrap();
        assert_eq!(config.databases.tgt.user, "postgres");
        // Default thread budget when the performance section is absent.
        assert_eq!(config.performance.thread_count, 4);
    }

    #[test]
    fn test_from_json_invalid_syntax() {
        let result = Config::from_json(r#"{ "databases": { invalid json }"#);
        assert!(matches!(result.unwrap_err(), CheckError::Config(_)));
    }

    #[test]
    fn test_from_yaml_missing_databases() {
        let result = Config::from_yaml("check_scope:\n  tables: [HR.EMP]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_yml_extension() {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        file.write_all(VALID_YAML.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.databases.src.user, "system");
    }

    #[test]
    fn test_load_json_extension() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(VALID_JSON.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.databases.src.user, "system");
    }

    #[test]
    fn test_load_unknown_extension_defaults_to_yaml() {
        let mut file = NamedTempFile::with_suffix(".conf").unwrap();
        file.write_all(VALID_YAML.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.databases.src.user, "system");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("definitely/not/here.yml");
        assert!(matches!(result.unwrap_err(), CheckError::Config(_)));
    }
}
