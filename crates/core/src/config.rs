//! TOML-based configuration system for Templup.
//!
//! Sensitive values (the deployment webhook secret) are stored as `_env`
//! fields that reference environment variable names. The actual secrets are
//! resolved at runtime via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server / runtime settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Version registry settings.
    pub registry: RegistryConfig,

    /// Backup retention settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Deployment webhook settings.
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Customization analyzer settings.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Server / runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the REST API (default `127.0.0.1:3000`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persistent data (database).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_listen() -> String {
    "127.0.0.1:3000".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/templup")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Version registry configuration.
///
/// The registry directory holds `catalog.toml` (the append-only version
/// catalog) and a `payloads/<version>/` tree with the updated file contents
/// for each published version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the registry directory.
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

/// Backup retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Days a backup is kept before it expires (default 30).
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    30
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// Deployment webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Deployment trigger endpoint. Unset disables auto-deploy.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Environment variable holding the webhook HMAC signing secret.
    #[serde(default)]
    pub secret_env: Option<String>,

    /// Request timeout in seconds (default 30). A timeout is reported as a
    /// failed deployment, never as an indeterminate state.
    #[serde(default = "default_deploy_timeout")]
    pub timeout_secs: u64,

    /// Manual deployment steps surfaced when the trigger fails.
    #[serde(default = "default_fallback")]
    pub fallback_instructions: String,

    /// Support contact surfaced alongside the fallback instructions.
    #[serde(default)]
    pub support_contact: Option<String>,

    /// Resolved webhook secret (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub secret: Option<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            secret_env: None,
            timeout_secs: default_deploy_timeout(),
            fallback_instructions: default_fallback(),
            support_contact: None,
            secret: None,
        }
    }
}

fn default_deploy_timeout() -> u64 {
    30
}
fn default_fallback() -> String {
    "Deployment could not be triggered automatically. The template is updated \
     but not deployed: push the template files to your hosting platform \
     manually, or retry the deployment from the dashboard."
        .into()
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Customization analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Glob patterns for files the analyzer never treats as customizations
    /// (build output, lockfiles, caches).
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        "node_modules/**".into(),
        "dist/**".into(),
        "*.lock".into(),
        ".cache/**".into(),
    ]
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `*_env` fields from environment variables and populate the
    /// corresponding resolved fields.
    ///
    /// Fields that reference a missing variable log a warning but do **not**
    /// fail -- callers check the `Option` fields per execution mode.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        if let Some(ref env_name) = self.deploy.secret_env {
            self.deploy.secret = resolve_optional_env(env_name, "deploy.secret_env");
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "registry.path".into(),
                detail: "registry path must not be empty".into(),
            });
        }
        if self.backup.retention_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backup.retention_days".into(),
                detail: "retention must be at least one day".into(),
            });
        }
        if self.deploy.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "deploy.timeout_secs".into(),
                detail: "deploy timeout must be > 0".into(),
            });
        }
        if let Some(ref url) = self.deploy.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "deploy.webhook_url".into(),
                    detail: "webhook URL must be http(s)".into(),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// A commented default configuration, written by `templup init`.
    pub fn default_toml() -> &'static str {
        r#"# Templup configuration

[server]
listen = "127.0.0.1:3000"
log_level = "info"
data_dir = "/var/lib/templup"

[registry]
# Directory containing catalog.toml and payloads/<version>/
path = "/var/lib/templup/registry"

[backup]
retention_days = 30

[deploy]
# webhook_url = "https://deploy.example.com/hooks/templup"
# secret_env = "TEMPLUP_DEPLOY_SECRET"
timeout_secs = 30
# support_contact = "support@example.com"

[analyzer]
ignore_patterns = ["node_modules/**", "dist/**", "*.lock", ".cache/**"]
"#
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[server]
listen = "0.0.0.0:8080"
log_level = "debug"
data_dir = "/tmp/templup"

[registry]
path = "/tmp/templup/registry"

[backup]
retention_days = 14

[deploy]
webhook_url = "https://deploy.example.com/hooks/templup"
secret_env = "TEMPLUP_DEPLOY_SECRET"
timeout_secs = 10
support_contact = "support@example.com"

[analyzer]
ignore_patterns = ["dist/**"]
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.backup.retention_days, 14);
        assert_eq!(config.deploy.timeout_secs, 10);
        assert_eq!(config.analyzer.ignore_patterns, vec!["dist/**"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.backup.retention_days = 0;
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "backup.retention_days"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_webhook_url() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.deploy.webhook_url = Some("ftp://nope".into());
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "deploy.webhook_url"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_TEMPLUP_SECRET", "s3cret");

        let mut config: AppConfig = toml::from_str(
            r#"
[registry]
path = "/tmp/registry"
[deploy]
secret_env = "TEST_TEMPLUP_SECRET"
"#,
        )
        .unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.deploy.secret.as_deref(), Some("s3cret"));

        std::env::remove_var("TEST_TEMPLUP_SECRET");
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[registry]
path = "/tmp/registry"
"#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:3000");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.backup.retention_days, 30);
        assert_eq!(config.deploy.timeout_secs, 30);
        assert!(!config.analyzer.ignore_patterns.is_empty());
    }

    #[test]
    fn test_default_toml_parses() {
        let config: AppConfig =
            toml::from_str(AppConfig::default_toml()).expect("default config must parse");
        config.validate().expect("default config must validate");
    }
}
