//! Stack configuration with validation and versioning.

use crate::error::{ConfigError, Result};
use crate::{
    DEFAULT_ACTIVE_INTERPRETER, DEFAULT_DATABASE_PORT, DEFAULT_DATABASE_START_SECS,
    DEFAULT_FASTCGI_BASE_PORT, DEFAULT_HOST, DEFAULT_INTERPRETER_START_SECS,
    DEFAULT_INTERPRETER_VERSIONS, DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_SHUTDOWN_SECS,
    DEFAULT_WEB_SERVER_PORT, DEFAULT_WEB_SERVER_START_SECS, MIN_PORT,
};
use crate::{
    DatabaseSettings, InterpreterSettings, LoggingSettings, TimeoutSettings, WebServerSettings,
};

use std::collections::HashSet;
use std::panic::Location;
use std::path::Path;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

const CONFIG_FILENAME: &str = "stackbox.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Web server settings
    #[serde(default)]
    pub web_server: WebServerSettings,

    /// Database server settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Script interpreter settings
    #[serde(default)]
    pub interpreter: InterpreterSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Lifecycle timeout settings
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
pub(crate) fn default_host() -> String {
    DEFAULT_HOST.into()
}
pub(crate) fn default_web_server_port() -> u16 {
    DEFAULT_WEB_SERVER_PORT
}
pub(crate) fn default_database_port() -> u16 {
    DEFAULT_DATABASE_PORT
}
pub(crate) fn default_versions() -> Vec<String> {
    DEFAULT_INTERPRETER_VERSIONS
        .iter()
        .map(|v| (*v).into())
        .collect()
}
pub(crate) fn default_active_interpreter() -> String {
    DEFAULT_ACTIVE_INTERPRETER.into()
}
pub(crate) fn default_fastcgi_base_port() -> u16 {
    DEFAULT_FASTCGI_BASE_PORT
}
pub(crate) fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
pub(crate) fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}
pub(crate) fn default_web_server_start() -> u64 {
    DEFAULT_WEB_SERVER_START_SECS
}
pub(crate) fn default_database_start() -> u64 {
    DEFAULT_DATABASE_START_SECS
}
pub(crate) fn default_interpreter_start() -> u64 {
    DEFAULT_INTERPRETER_START_SECS
}
pub(crate) fn default_shutdown() -> u64 {
    DEFAULT_SHUTDOWN_SECS
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            web_server: WebServerSettings::default(),
            database: DatabaseSettings::default(),
            interpreter: InterpreterSettings::default(),
            logging: LoggingSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

// === Configuration Operations ===

impl StackConfig {
    /// Load config from file, creating default if not exists.
    pub fn load_or_create(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join(CONFIG_FILENAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

            // Migrate if needed
            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(base_dir)?;
            }

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(base_dir)?;
            Ok(config)
        }
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern to prevent
    /// partial writes if the process is interrupted.
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let config_path = base_dir.join(CONFIG_FILENAME);
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Write atomically via temp file
        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> Result<Self> {
        // Version 0 -> 1: Add timeout settings
        if config.version == 0 {
            config.timeouts = TimeoutSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        // Ports must be unprivileged
        for (name, port) in [
            ("web_server.port", self.web_server.port),
            ("database.port", self.database.port),
            ("interpreter.fastcgi_base_port", self.interpreter.fastcgi_base_port),
        ] {
            if port < MIN_PORT {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be >= {MIN_PORT} (unprivileged)"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        // Host must be localhost for security
        if self.web_server.host != DEFAULT_HOST && self.web_server.host != "localhost" {
            return Err(ConfigError::Invalid {
                message: format!("Host must be {DEFAULT_HOST} or localhost for security"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.interpreter.versions.is_empty() {
            return Err(ConfigError::Invalid {
                message: "At least one interpreter version must be configured".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let unique: HashSet<&str> = self.interpreter.versions.iter().map(String::as_str).collect();
        if unique.len() != self.interpreter.versions.len() {
            return Err(ConfigError::Invalid {
                message: "Interpreter versions must be unique".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // The active version must be one of the configured versions
        if !self.interpreter.versions.contains(&self.interpreter.active) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "Active interpreter {} is not in the configured version list",
                    self.interpreter.active
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // The FastCGI block must fit below u16::MAX and not collide
        // with the fixed service ports
        let version_count = self.interpreter.versions.len() as u16;
        let Some(fastcgi_end) = self
            .interpreter
            .fastcgi_base_port
            .checked_add(version_count - 1)
        else {
            return Err(ConfigError::Invalid {
                message: format!(
                    "interpreter.fastcgi_base_port {} leaves no room for {} versions",
                    self.interpreter.fastcgi_base_port, version_count
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        };
        for (name, port) in [
            ("web_server.port", self.web_server.port),
            ("database.port", self.database.port),
        ] {
            if port >= self.interpreter.fastcgi_base_port && port <= fastcgi_end {
                return Err(ConfigError::Invalid {
                    message: format!("{name} collides with the FastCGI port range"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        if self.web_server.port == self.database.port {
            return Err(ConfigError::Invalid {
                message: "web_server.port and database.port must differ".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Grace periods must be positive
        for (name, secs) in [
            ("timeouts.web_server_start_secs", self.timeouts.web_server_start_secs),
            ("timeouts.database_start_secs", self.timeouts.database_start_secs),
            ("timeouts.interpreter_start_secs", self.timeouts.interpreter_start_secs),
            ("timeouts.shutdown_secs", self.timeouts.shutdown_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be > 0"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(())
    }
}
