//! Configuration management
//!
//! This module handles loading and parsing configuration for uBlog.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Password hashing work factor
    #[serde(default)]
    pub password: PasswordConfig,
    /// Template configuration
    #[serde(default)]
    pub theme: ThemeConfig,
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
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
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
    "data/ublog.db".to_string()
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

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where session data lives (memory or database)
    #[serde(default)]
    pub driver: SessionDriver,
    /// Key used to sign the session cookie. Empty means "generate one at startup".
    #[serde(default)]
    pub secret: String,
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Sessions idle for longer than this are discarded
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Add the `Secure` attribute to the cookie (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            driver: SessionDriver::default(),
            secret: String::new(),
            cookie_name: default_cookie_name(),
            idle_timeout_seconds: default_idle_timeout(),
            secure_cookie: false,
        }
    }
}

fn default_cookie_name() -> String {
    "ublog_session".to_string()
}

fn default_idle_timeout() -> u64 {
    7 * 24 * 60 * 60
}

/// Upper bound for `session.idle_timeout_seconds` (ten years)
pub const MAX_IDLE_TIMEOUT_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Session backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionDriver {
    /// In-process memory (default, single instance)
    #[default]
    Memory,
    /// The `sessions` table
    Database,
}

/// Argon2 work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Number of passes
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Degree of parallelism
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory whose `.html` files override the embedded templates
    #[serde(default)]
    pub path: Option<PathBuf>,
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
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        key: &'static str,
        message: String,
    },
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

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - UBLOG_SERVER_HOST
    /// - UBLOG_SERVER_PORT
    /// - UBLOG_DATABASE_DRIVER
    /// - UBLOG_DATABASE_URL
    /// - UBLOG_SESSION_DRIVER
    /// - UBLOG_SESSION_SECRET
    /// - UBLOG_SESSION_IDLE_TIMEOUT_SECONDS
    /// - UBLOG_THEME_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the system cannot represent
    fn validate(&self) -> Result<(), ConfigError> {
        let idle = self.session.idle_timeout_seconds;
        if idle == 0 || idle > MAX_IDLE_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidValue {
                key: "session.idle_timeout_seconds",
                message: format!(
                    "{} is out of range (1..={})",
                    idle, MAX_IDLE_TIMEOUT_SECONDS
                ),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("UBLOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("UBLOG_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("UBLOG_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("UBLOG_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("UBLOG_SESSION_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.session.driver = SessionDriver::Memory,
                "database" => self.session.driver = SessionDriver::Database,
                _ => {}
            }
        }
        if let Ok(secret) = std::env::var("UBLOG_SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Ok(timeout) = std::env::var("UBLOG_SESSION_IDLE_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.session.idle_timeout_seconds = timeout;
            }
        }

        if let Ok(path) = std::env::var("UBLOG_THEME_PATH") {
            self.theme.path = Some(PathBuf::from(path));
        }
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

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "UBLOG_SERVER_HOST",
        "UBLOG_SERVER_PORT",
        "UBLOG_DATABASE_DRIVER",
        "UBLOG_DATABASE_URL",
        "UBLOG_SESSION_DRIVER",
        "UBLOG_SESSION_SECRET",
        "UBLOG_SESSION_IDLE_TIMEOUT_SECONDS",
        "UBLOG_THEME_PATH",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/ublog.db");
        assert_eq!(config.session.driver, SessionDriver::Memory);
        assert_eq!(config.session.cookie_name, "ublog_session");
        assert_eq!(config.session.idle_timeout_seconds, 604800);
        assert!(config.session.secret.is_empty());
        assert_eq!(config.password, PasswordConfig::default());
        assert!(config.theme.path.is_none());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\npassword:\n  iterations: 4\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.password.iterations, 4);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.password.memory_kib, argon2::Params::DEFAULT_M_COST);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  driver: mysql
  url: "mysql://root@localhost/fblog"
session:
  driver: database
  secret: "uBlog"
  cookie_name: "sid"
  idle_timeout_seconds: 3600
  secure_cookie: true
password:
  memory_kib: 65536
  iterations: 3
  parallelism: 2
theme:
  path: "custom_templates"
"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.url, "mysql://root@localhost/fblog");
        assert_eq!(config.session.driver, SessionDriver::Database);
        assert_eq!(config.session.secret, "uBlog");
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.session.idle_timeout_seconds, 3600);
        assert!(config.session.secure_cookie);
        assert_eq!(
            config.password,
            PasswordConfig { memory_kib: 65536, iterations: 3, parallelism: 2 }
        );
        assert_eq!(config.theme.path, Some(PathBuf::from("custom_templates")));
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let result = Config::load(file.path());

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("parse") || err_msg.contains("invalid"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_override_server_and_database() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: \"0.0.0.0\"\n  port: 8080\n").unwrap();

        std::env::set_var("UBLOG_SERVER_HOST", "192.168.1.1");
        std::env::set_var("UBLOG_SERVER_PORT", "4000");
        std::env::set_var("UBLOG_DATABASE_DRIVER", "mysql");
        std::env::set_var("UBLOG_DATABASE_URL", "mysql://test@localhost/db");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.url, "mysql://test@localhost/db");

        clear_env();
    }

    #[test]
    fn test_env_override_session_config() {
        let _guard = lock_env();
        clear_env();

        let file = NamedTempFile::new().unwrap();

        std::env::set_var("UBLOG_SESSION_DRIVER", "database");
        std::env::set_var("UBLOG_SESSION_SECRET", "from-env");
        std::env::set_var("UBLOG_SESSION_IDLE_TIMEOUT_SECONDS", "60");
        std::env::set_var("UBLOG_THEME_PATH", "/srv/templates");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.session.driver, SessionDriver::Database);
        assert_eq!(config.session.secret, "from-env");
        assert_eq!(config.session.idle_timeout_seconds, 60);
        assert_eq!(config.theme.path, Some(PathBuf::from("/srv/templates")));

        clear_env();
    }

    #[test]
    fn test_idle_timeout_out_of_range_rejected() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "session:\n  idle_timeout_seconds: 18446744073709551615\n").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("session.idle_timeout_seconds"));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "session:\n  idle_timeout_seconds: 0\n").unwrap();
        assert!(Config::load(file.path()).is_err());

        let file = NamedTempFile::new().unwrap();
        std::env::set_var("UBLOG_SESSION_IDLE_TIMEOUT_SECONDS", u64::MAX.to_string());
        let result = Config::load_with_env(file.path());
        clear_env();
        assert!(result.is_err());

        let file = NamedTempFile::new().unwrap();
        std::env::set_var(
            "UBLOG_SESSION_IDLE_TIMEOUT_SECONDS",
            MAX_IDLE_TIMEOUT_SECONDS.to_string(),
        );
        let config = Config::load_with_env(file.path());
        clear_env();
        assert_eq!(config.unwrap().session.idle_timeout_seconds, MAX_IDLE_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\ndatabase:\n  driver: sqlite\n").unwrap();

        std::env::set_var("UBLOG_SERVER_PORT", "not_a_number");
        std::env::set_var("UBLOG_DATABASE_DRIVER", "invalid_driver");
        std::env::set_var("UBLOG_SESSION_DRIVER", "redis");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.session.driver, SessionDriver::Memory);

        clear_env();
    }
}
