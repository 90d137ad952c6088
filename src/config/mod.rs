//! Configuration management
//!
//! Configuration is read from a `config.yml` file, then selected values can be
//! overridden through `MARVELVERSE_*` environment variables.
//!
//! Missing sections and keys are filled with defaults, and a missing or empty
//! file yields the default configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Template theme settings
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Login session settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Site identity shown in templates
    #[serde(default)]
    pub site: SiteConfig,
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
    /// Public origin of the site (scheme://host[:port]).
    /// Used for CORS and for rejecting cross-site form posts.
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            origin: default_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL or SQLite file path
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
    "data/marvelverse.db".to_string()
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

/// Theme configuration
///
/// Templates are compiled into the binary. A directory at `path/active`
/// may override any of them by file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Active theme name
    #[serde(default = "default_theme")]
    pub active: String,
    /// Path to themes directory
    #[serde(default = "default_theme_path")]
    pub path: PathBuf,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            active: default_theme(),
            path: default_theme_path(),
        }
    }
}

fn default_theme() -> String {
    "default".to_string()
}

fn default_theme_path() -> PathBuf {
    PathBuf::from("themes")
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Days until a login session expires
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
        }
    }
}

fn default_ttl_days() -> i64 {
    7
}

/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Site identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_site_description")]
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: default_site_description(),
        }
    }
}

fn default_site_name() -> String {
    "Marvelverse".to_string()
}

fn default_site_description() -> String {
    "Characters, comics and series of the Marvel universe".to_string()
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
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with the
    /// line and column of the problem.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
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

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - MARVELVERSE_SERVER_HOST
    /// - MARVELVERSE_SERVER_PORT
    /// - MARVELVERSE_SERVER_ORIGIN
    /// - MARVELVERSE_DATABASE_DRIVER
    /// - MARVELVERSE_DATABASE_URL
    /// - MARVELVERSE_THEME_ACTIVE
    /// - MARVELVERSE_THEME_PATH
    /// - MARVELVERSE_SESSION_TTL_DAYS
    /// - MARVELVERSE_SITE_NAME
    ///
    /// Values that fail to parse are ignored.
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&self.session.ttl_days) {
            return Err(ConfigError::ValidationError(format!(
                "session.ttl_days must be between 1 and {}",
                MAX_SESSION_TTL_DAYS
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MARVELVERSE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MARVELVERSE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(origin) = std::env::var("MARVELVERSE_SERVER_ORIGIN") {
            self.server.origin = origin;
        }

        if let Ok(driver) = std::env::var("MARVELVERSE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("MARVELVERSE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(active) = std::env::var("MARVELVERSE_THEME_ACTIVE") {
            self.theme.active = active;
        }
        if let Ok(path) = std::env::var("MARVELVERSE_THEME_PATH") {
            self.theme.path = PathBuf::from(path);
        }

        if let Ok(days) = std::env::var("MARVELVERSE_SESSION_TTL_DAYS") {
            match days.parse::<i64>() {
                Ok(days) if (1..=MAX_SESSION_TTL_DAYS).contains(&days) => {
                    self.session.ttl_days = days
                }
                _ => {}
            }
        }

        if let Ok(name) = std::env::var("MARVELVERSE_SITE_NAME") {
            self.site.name = name;
        }
    }
}

/// Format YAML parsing error with location
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

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "MARVELVERSE_SERVER_HOST",
    "MARVELVERSE_SERVER_PORT",
    "MARVELVERSE_SERVER_ORIGIN",
    "MARVELVERSE_DATABASE_DRIVER",
    "MARVELVERSE_DATABASE_URL",
    "MARVELVERSE_THEME_ACTIVE",
    "MARVELVERSE_THEME_PATH",
    "MARVELVERSE_SESSION_TTL_DAYS",
    "MARVELVERSE_SITE_NAME",
];

#[cfg(test)]
fn lock_clean_env() -> std::sync::MutexGuard<'static, ()> {
    let guard = CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
    guard
}
