//! On-disk layout of the portable stack installation.

use crate::error::{ConfigError, Result};

use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use tracing::info;

/// Resolves every path the supervisor touches relative to a single
/// base directory, so the whole installation stays relocatable.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    base: PathBuf,
}

impl DirectoryLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn web_server_root(&self) -> PathBuf {
        self.base.join("apache")
    }

    pub fn web_server_bin(&self) -> PathBuf {
        self.web_server_root().join("bin")
    }

    pub fn web_server_conf(&self) -> PathBuf {
        self.web_server_root().join("conf")
    }

    pub fn database_root(&self) -> PathBuf {
        self.base.join("mysql")
    }

    pub fn database_bin(&self) -> PathBuf {
        self.database_root().join("bin")
    }

    pub fn database_data(&self) -> PathBuf {
        self.database_root().join("data")
    }

    pub fn interpreter_root(&self) -> PathBuf {
        self.base.join("php")
    }

    pub fn interpreter_dir(&self, version: &str) -> PathBuf {
        self.interpreter_root().join(version)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join("config")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.base.join("config-backups")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn document_root(&self) -> PathBuf {
        self.base.join("www")
    }

    /// Directories that must exist before any service can start.
    /// Interpreter version directories are excluded; those are created
    /// per installed version, not unconditionally.
    pub fn roots(&self) -> Vec<PathBuf> {
        vec![
            self.web_server_bin(),
            self.web_server_conf(),
            self.database_bin(),
            self.database_data(),
            self.interpreter_root(),
            self.config_dir(),
            self.backup_dir(),
            self.log_dir(),
            self.document_root(),
        ]
    }

    /// Create the directory tree. Idempotent; existing directories are
    /// left untouched.
    pub fn ensure(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for dir in self.roots() {
            if !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|source| {
                    ConfigError::DirectoryCreation {
                        path: dir.clone(),
                        source,
                        location: ErrorLocation::from(Location::caller()),
                    }
                })?;
                info!(path = %dir.display(), "Created directory");
                created.push(dir);
            }
        }
        Ok(created)
    }
}
