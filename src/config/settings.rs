//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! [`MilvusSettings`] is the resolved form handed to the Milvus client once
//! CLI and environment overrides have been applied.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Database used when neither the CLI nor the config file names one.
pub const DEFAULT_DB_NAME: &str = "default";

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Milvus connection settings.
    #[serde(default)]
    pub milvus: MilvusConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref uri) = self.milvus.uri {
            validate_uri(uri)?;
        }
        if self.milvus.timeout_secs == Some(0) {
            return Err(ConfigError::validation(
                "milvus.timeout_secs must be greater than zero",
            ));
        }
        if self.milvus.db_name.trim().is_empty() {
            return Err(ConfigError::validation("milvus.db_name cannot be empty"));
        }
        Ok(())
    }

    /// Resolves the Milvus connection settings.
    ///
    /// Values from `overrides` (CLI flags or environment) take precedence over
    /// the config file. An empty token is treated as no token.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint URI is configured anywhere, or if the
    /// resolved URI or database name is invalid.
    pub fn milvus_settings(
        &self,
        overrides: ConnectionOverrides,
    ) -> Result<MilvusSettings, ConfigError> {
        let uri = overrides
            .uri
            .or_else(|| self.milvus.uri.clone())
            .ok_or_else(|| {
                ConfigError::validation(
                    "Milvus URI is required (pass --milvus-uri, set MILVUS_URI, or set milvus.uri)",
                )
            })?;
        validate_uri(&uri)?;

        let db_name = overrides
            .db_name
            .unwrap_or_else(|| self.milvus.db_name.clone());
        if db_name.trim().is_empty() {
            return Err(ConfigError::validation("database name cannot be empty"));
        }

        let token = overrides
            .token
            .or_else(|| self.milvus.token.clone())
            .filter(|t| !t.is_empty());

        Ok(MilvusSettings {
            uri: uri.trim_end_matches('/').to_string(),
            token,
            db_name,
            timeout: self.milvus.timeout_secs.map(Duration::from_secs),
        })
    }
}

fn validate_uri(uri: &str) -> Result<(), ConfigError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::validation(format!(
            "Invalid Milvus URI '{uri}'. Must start with http:// or https://"
        )))
    }
}

/// Milvus connection section of the config file.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MilvusConfig {
    /// Endpoint URI, e.g. `http://localhost:19530`.
    #[serde(default)]
    pub uri: Option<String>,

    /// Auth token (`user:password` or an API key).
    #[serde(default)]
    pub token: Option<String>,

    /// Database name.
    /// Default: "default"
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// HTTP request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            uri: None,
            token: None,
            db_name: default_db_name(),
            timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for MilvusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusConfig")
            .field("uri", &self.uri)
            .field("token", &redacted(self.token.as_deref()))
            .field("db_name", &self.db_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Connection values supplied on the command line or through the environment.
#[derive(Clone, Default)]
pub struct ConnectionOverrides {
    /// `--milvus-uri` / `MILVUS_URI`.
    pub uri: Option<String>,
    /// `--milvus-token` / `MILVUS_TOKEN`.
    pub token: Option<String>,
    /// `--db-name` / `MILVUS_DB`.
    pub db_name: Option<String>,
}

impl std::fmt::Debug for ConnectionOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOverrides")
            .field("uri", &self.uri)
            .field("token", &redacted(self.token.as_deref()))
            .field("db_name", &self.db_name)
            .finish()
    }
}

/// Fully resolved Milvus connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct MilvusSettings {
    /// Endpoint URI without a trailing slash.
    pub uri: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Database every request is scoped to.
    pub db_name: String,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl MilvusSettings {
    /// Creates settings for `uri` with no token, the default database, and no timeout.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            token: None,
            db_name: default_db_name(),
            timeout: None,
        }
    }
}

// Debug impls for types holding a token are hand-written so the token never
// reaches the logs.
fn redacted(token: Option<&str>) -> Option<&'static str> {
    token.map(|_| "<redacted>")
}

impl std::fmt::Debug for MilvusSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusSettings")
            .field("uri", &self.uri)
            .field("token", &redacted(self.token.as_deref()))
            .field("db_name", &self.db_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
