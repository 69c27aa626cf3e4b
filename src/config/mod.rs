//! Configuration management
//!
//! This module handles loading and parsing configuration for the sattl backend.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Secret used when nothing else is configured. Fine for local development only.
pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

/// Longest accepted access token lifetime (one year)
pub const MAX_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 365;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Media storage configuration
    #[serde(default)]
    pub media: MediaConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name shown by the root endpoint
    #[serde(default = "default_project_name")]
    pub project_name: String,
    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            project_name: default_project_name(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_project_name() -> String {
    "Schwob aufm Sattl".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/sattl.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Bearer token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Token lifetime in minutes (default: 7 days)
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            access_token_expire_minutes: default_access_token_expire_minutes(),
        }
    }
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_access_token_expire_minutes() -> i64 {
    60 * 24 * 7
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Root directory for uploaded files
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// Maximum image size in bytes (default: 10MB)
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            max_image_size: default_max_image_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_max_image_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
    ]
}

impl MediaConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - SATTL_SERVER_HOST
    /// - SATTL_SERVER_PORT
    /// - SATTL_SERVER_CORS_ORIGINS (comma separated)
    /// - SATTL_DATABASE_DRIVER
    /// - SATTL_DATABASE_URL
    /// - SATTL_AUTH_SECRET_KEY
    /// - SATTL_AUTH_ACCESS_TOKEN_EXPIRE_MINUTES
    /// - SATTL_MEDIA_ROOT
    /// - SATTL_MEDIA_MAX_IMAGE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("SATTL_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SATTL_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(origins) = std::env::var("SATTL_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        // Database configuration
        if let Ok(driver) = std::env::var("SATTL_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SATTL_DATABASE_URL") {
            self.database.url = url;
        }

        // Auth configuration
        if let Ok(secret) = std::env::var("SATTL_AUTH_SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Ok(minutes) = std::env::var("SATTL_AUTH_ACCESS_TOKEN_EXPIRE_MINUTES") {
            if let Ok(minutes) = minutes.parse::<i64>() {
                self.auth.access_token_expire_minutes = minutes;
            }
        }

        // Media configuration
        if let Ok(root) = std::env::var("SATTL_MEDIA_ROOT") {
            self.media.root = PathBuf::from(root);
        }
        if let Ok(size) = std::env::var("SATTL_MEDIA_MAX_IMAGE_SIZE") {
            if let Ok(size) = size.parse::<u64>() {
                self.media.max_image_size = size;
            }
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must not be 0".to_string(),
            ));
        }
        if self.auth.secret_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.secret_key must not be empty".to_string(),
            ));
        }
        if self.auth.access_token_expire_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.access_token_expire_minutes must be positive".to_string(),
            ));
        }
        if self.auth.access_token_expire_minutes > MAX_TOKEN_EXPIRE_MINUTES {
            return Err(ConfigError::ValidationError(format!(
                "auth.access_token_expire_minutes must not exceed {}",
                MAX_TOKEN_EXPIRE_MINUTES
            )));
        }
        if self.media.allowed_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "media.allowed_types must list at least one MIME type".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the signing secret is still the built-in development value
    pub fn uses_default_secret(&self) -> bool {
        self.auth.secret_key == DEFAULT_SECRET_KEY
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
