//! Configuration loading for the portal maintenance service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `PORTAL_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `PORTAL_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Key used to sign session cookies; required outside local/test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_secret: Option<String>,
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
    /// Base URL encoded into printed QR stickers
    #[serde(default = "default_qr_base_url")]
    pub qr_base_url: String,
    /// Gotenberg HTML-to-PDF conversion endpoint base URL
    #[serde(default = "default_gotenberg_url")]
    pub gotenberg_url: String,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

/// SMTP transport configuration. Email sending is disabled when `host` is
/// unset; the server then falls back to the mock mailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SmtpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// RFC 5322 "From" address; defaults to the username when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl SmtpConfig {
    /// Sender address used on outgoing mail.
    pub fn from_address(&self) -> Option<String> {
        self.from.clone().or_else(|| self.username.clone())
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            session_secret: None,
            session_ttl_seconds: default_session_ttl_seconds(),
            qr_base_url: default_qr_base_url(),
            gotenberg_url: default_gotenberg_url(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.session_secret.is_some() {
            config.session_secret = Some("[REDACTED]".to_string());
        }
        if config.smtp.password.is_some() {
            config.smtp.password = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings
    /// are missing or out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.profile.as_str(), "local" | "test") && self.session_secret.is_none() {
            return Err(ConfigError::MissingSessionSecret);
        }

        if let Some(ref secret) = self.session_secret
            && secret.len() < 32
        {
            return Err(ConfigError::SessionSecretTooShort {
                length: secret.len(),
            });
        }

        if self.session_ttl_seconds == 0 {
            return Err(ConfigError::InvalidSessionTtl {
                value: self.session_ttl_seconds,
            });
        }

        if self.smtp.host.is_some() && self.smtp.from_address().is_none() {
            return Err(ConfigError::MissingSmtpFrom);
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_session_ttl_seconds() -> u64 {
    86400 * 7 // 7 days, as the login form promises
}

fn default_qr_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_gotenberg_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("session secret is missing; set PORTAL_SESSION_SECRET environment variable")]
    MissingSessionSecret,
    #[error("session secret must be at least 32 bytes, got {length}")]
    SessionSecretTooShort { length: usize },
    #[error("session ttl must be positive, got {value}")]
    InvalidSessionTtl { value: u64 },
    #[error("SMTP is configured but no from address could be derived; set PORTAL_SMTP_FROM")]
    MissingSmtpFrom,
}

/// Loads configuration using layered `.env` files and `PORTAL_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration from layered env files overlaid by the process
    /// environment (which wins).
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("PORTAL_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let session_secret = layered.remove("SESSION_SECRET").filter(|v| !v.is_empty());
        let session_ttl_seconds = layered
            .remove("SESSION_TTL_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_session_ttl_seconds);
        let qr_base_url = layered
            .remove("QR_BASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_qr_base_url);
        let gotenberg_url = layered
            .remove("GOTENBERG_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_gotenberg_url);

        let smtp = SmtpConfig {
            host: layered.remove("SMTP_HOST").filter(|v| !v.is_empty()),
            port: layered
                .remove("SMTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_smtp_port),
            username: layered.remove("SMTP_USERNAME").filter(|v| !v.is_empty()),
            password: layered.remove("SMTP_PASSWORD").filter(|v| !v.is_empty()),
            from: layered.remove("SMTP_FROM").filter(|v| !v.is_empty()),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            session_secret,
            session_ttl_seconds,
            qr_base_url,
            gotenberg_url,
            smtp,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("PORTAL_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("PORTAL_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
