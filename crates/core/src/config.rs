//! TOML-based configuration for the Treestatus dashboard.
//!
//! The API token is never stored in the file. `token_env` names an
//! environment variable that is read at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote Treestatus API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Page chrome.
    #[serde(default)]
    pub ui: UiConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8080`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote API
// ---------------------------------------------------------------------------

/// Which Treestatus backend the dashboard talks to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    /// The real service at `api.url`.
    #[default]
    Remote,
    /// In-memory sample data, for local development.
    Stub,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub mode: ApiMode,

    /// Treestatus API root, e.g. `https://lando.example.com/treestatus`.
    #[serde(default)]
    pub url: String,

    /// Environment variable holding the API bearer token.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Per-request timeout in seconds (default 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            mode: ApiMode::default(),
            url: String::new(),
            token_env: None,
            timeout_secs: default_timeout(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Title shown in the page header.
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "Treestatus".into()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
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

    /// Resolve `*_env` fields from environment variables.
    ///
    /// A missing variable logs a warning and leaves the field unset; the API
    /// is then called without a token.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.api.token_env {
            self.api.token = resolve_optional_env(env_name, "api.token_env");
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.mode == ApiMode::Remote {
            if self.api.url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "api.url".into(),
                    detail: "API URL must not be empty in remote mode".into(),
                });
            }
            if !(self.api.url.starts_with("http://") || self.api.url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "api.url".into(),
                    detail: "API URL must start with http:// or https://".into(),
                });
            }
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if self.server.listen.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.listen".into(),
                detail: "listen address must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Load, resolve, and validate in one call.
    ///
    /// `mode` overrides `api.mode` from the file before validation, so a
    /// stub run does not need a remote URL.
    pub fn load_and_resolve<P: AsRef<Path>>(
        path: P,
        mode: Option<ApiMode>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        if let Some(mode) = mode {
            config.api.mode = mode;
        }
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
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
listen = "0.0.0.0:9000"
log_level = "debug"

[api]
mode = "remote"
url = "https://lando.example.com/treestatus"
token_env = "TREESTATUS_TOKEN"
timeout_secs = 10

[ui]
title = "Firefox Treestatus"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.api.mode, ApiMode::Remote);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.token_env.as_deref(), Some("TREESTATUS_TOKEN"));
        assert_eq!(config.ui.title, "Firefox Treestatus");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treestatus.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/treestatus.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[api\nurl = ").unwrap();
        let result = AppConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_requires_url_in_remote_mode() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "api.url"
        ));

        let mut config = AppConfig::default();
        config.api.url = "lando.example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stub_mode_needs_no_url() {
        let config: AppConfig = toml::from_str("[api]\nmode = \"stub\"\n").unwrap();
        assert_eq!(config.api.mode, ApiMode::Stub);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_and_resolve_with_mode_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treestatus.toml");
        std::fs::write(&path, "[server]\nlisten = \"127.0.0.1:9100\"\n").unwrap();

        // Remote by default, and no URL is configured.
        let result = AppConfig::load_and_resolve(&path, None);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "api.url"
        ));

        let config = AppConfig::load_and_resolve(&path, Some(ApiMode::Stub)).unwrap();
        assert_eq!(config.api.mode, ApiMode::Stub);
        assert_eq!(config.server.listen, "127.0.0.1:9100");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.api.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "api.timeout_secs"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_TREESTATUS_TOKEN", "tok-123");

        let mut config: AppConfig = toml::from_str(
            r#"
[api]
url = "https://lando.example.com/treestatus"
token_env = "TEST_TREESTATUS_TOKEN"
"#,
        )
        .unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.api.token.as_deref(), Some("tok-123"));

        std::env::remove_var("TEST_TREESTATUS_TOKEN");
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.api.mode, ApiMode::Remote);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.ui.title, "Treestatus");
    }
}
