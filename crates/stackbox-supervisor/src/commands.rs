//! The command surface the presentation layer talks to. Everything a
//! frontend can ask the supervisor to do goes through [`ControlPanel`].

use crate::backup::{self, BackupReport};
use crate::bootstrap::{self, BootstrapReport};
use crate::error::{SupervisorError, SupervisorResult};
use crate::locator::{self, BinaryReport};
use crate::probe::Prober;
use crate::registry::ServiceRegistry;
use crate::reporter::StatusReporter;
use crate::state::{ServiceSnapshot, StackSnapshot};
use crate::version::probe_version;

use std::panic::Location;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use error_location::ErrorLocation;
use serde::Serialize;
use stackbox_config::{
    DirectoryLayout, ServiceDefinition, ServiceKey, ServiceKind, StackConfig, VersionTag,
};
use tokio::sync::RwLock;
use tracing::info;

/// One configured interpreter version as seen from outside.
#[derive(Debug, Clone, Serialize)]
pub struct InterpreterInfo {
    pub version: String,
    pub fastcgi_port: u16,
    pub installed: bool,
    pub running: bool,
    pub active: bool,
}

/// Result of an interactive interpreter shell session.
#[derive(Debug, Clone, Serialize)]
pub struct ShellOutcome {
    pub version: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryPathInfo {
    pub service: String,
    pub executable: PathBuf,
    pub exists: bool,
    /// Parsed from the binary's version banner, absent when unreadable
    pub version: Option<String>,
}

/// Diagnostic view of every path the supervisor resolves.
#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub document_root: PathBuf,
    pub log_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub binaries: Vec<BinaryPathInfo>,
}

pub struct ControlPanel {
    config: RwLock<StackConfig>,
    layout: DirectoryLayout,
    registry: Arc<ServiceRegistry>,
    reporter: StatusReporter,
}

impl ControlPanel {
    pub fn new(
        config: StackConfig,
        layout: DirectoryLayout,
        prober: Arc<dyn Prober>,
    ) -> SupervisorResult<Self> {
        let active = VersionTag::new(config.interpreter.active.clone()).map_err(|_| {
            SupervisorError::VersionNotInstalled {
                version: config.interpreter.active.clone(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let catalog = ServiceDefinition::catalog(&config, &layout);
        let registry = Arc::new(ServiceRegistry::new(catalog, active, prober));
        let reporter = StatusReporter::new(Arc::clone(&registry));

        Ok(Self {
            config: RwLock::new(config),
            layout,
            registry,
            reporter,
        })
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Which of the expected binaries are actually installed.
    pub fn check_binaries(&self) -> Vec<BinaryReport> {
        let defs: Vec<ServiceDefinition> =
            self.registry.definitions().into_iter().cloned().collect();
        locator::check_binaries(&defs)
    }

    /// Prepare the installation: directory tree plus default configs.
    pub async fn create_directory_structure(&self) -> SupervisorResult<BootstrapReport> {
        let config = self.config.read().await;
        bootstrap::create_directory_structure(&config, &self.layout)
    }

    pub fn status(&self, key: &ServiceKey) -> SupervisorResult<ServiceSnapshot> {
        self.reporter.snapshot(key)
    }

    pub async fn status_all(&self) -> StackSnapshot {
        self.reporter.snapshot_all().await
    }

    /// Toggle a service and report whether it is running afterwards.
    ///
    /// A toggle that will start a service first makes sure the on-disk
    /// prerequisites exist (directories, generated config, an
    /// initialized database data directory). Stops touch nothing on
    /// disk.
    pub async fn toggle(&self, key: &ServiceKey) -> SupervisorResult<bool> {
        if self.registry.state(key)?.is_startable() {
            self.prepare_start(key).await?;
        }
        let state = self.registry.toggle(key).await?;
        Ok(state.is_running())
    }

    async fn prepare_start(&self, key: &ServiceKey) -> SupervisorResult<()> {
        let config = self.config.read().await;
        self.layout.ensure()?;

        match key.kind() {
            ServiceKind::WebServer => {
                bootstrap::ensure_web_server_config(&config, &self.layout)?;
                // Re-rendered every start so an interpreter switch made
                // since the last start actually lands
                bootstrap::write_fastcgi_config(&config, &self.layout)?;
            }
            ServiceKind::Database => {
                bootstrap::ensure_database_config(&config, &self.layout)?;
                if config.database.initialize_on_first_start {
                    let def = self.registry.definition(key)?;
                    locator::require(def)?;
                    bootstrap::ensure_database_initialized(&def.executable, &self.layout).await?;
                }
            }
            ServiceKind::Interpreter => {}
        }
        Ok(())
    }

    /// Zip the database's data directory into config-backups/. The
    /// database must be running; backing up a crashed instance would
    /// freeze an inconsistent on-disk state into the archive.
    pub async fn backup_database(&self) -> SupervisorResult<BackupReport> {
        let snapshot = self.reporter.snapshot(&ServiceKey::Database)?;
        if !snapshot.state.is_running() {
            return Err(SupervisorError::ServiceNotRunning {
                service: ServiceKey::Database.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        backup::backup_database(&self.layout)
    }

    /// All configured interpreter versions with their installation and
    /// run state.
    pub async fn interpreters(&self) -> Vec<InterpreterInfo> {
        let active = self.registry.active_interpreter().await;

        self.registry
            .slots()
            .filter_map(|(key, slot)| {
                let ServiceKey::Interpreter(tag) = key else {
                    return None;
                };
                Some(InterpreterInfo {
                    version: tag.to_string(),
                    fastcgi_port: slot.definition.port,
                    installed: slot.definition.executable.is_file(),
                    running: slot.state().is_running(),
                    active: *tag == active,
                })
            })
            .collect()
    }

    /// Point the web server at a different interpreter version and
    /// persist the choice. Takes effect on the next web server start.
    pub async fn activate_interpreter(&self, version: &str) -> SupervisorResult<VersionTag> {
        let tag = VersionTag::new(version).map_err(|_| SupervisorError::VersionNotInstalled {
            version: version.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let tag = self.registry.set_active_interpreter(tag).await?;

        let mut config = self.config.write().await;
        config.interpreter.active = tag.to_string();
        config.save(self.layout.base())?;

        Ok(tag)
    }

    /// Run the interactive interpreter shell on the caller's terminal
    /// and wait for it to exit. Blocks for the whole session.
    pub async fn open_interpreter_shell(&self, version: &str) -> SupervisorResult<ShellOutcome> {
        let tag = VersionTag::new(version).map_err(|_| SupervisorError::VersionNotInstalled {
            version: version.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;
        let key = ServiceKey::Interpreter(tag.clone());
        if !self.registry.state(&key)?.is_running() {
            return Err(SupervisorError::ServiceNotRunning {
                service: key.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        let def = self.registry.definition(&key)?;
        let shell = locator::require_shell(def)?;

        info!(version = %tag, shell = %shell.display(), "Opening interpreter shell");

        let status = tokio::process::Command::new(shell)
            .arg("-a")
            .current_dir(&def.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| SupervisorError::ProcessSpawn {
                service: key.to_string(),
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(ShellOutcome {
            version: tag.to_string(),
            exit_code: status.code(),
        })
    }

    /// Every resolved path plus what is actually on disk. Version
    /// probing spawns the binaries, so this stays off the hot status
    /// path.
    pub async fn debug_paths(&self) -> PathReport {
        let mut binaries = Vec::new();
        for def in self.registry.definitions() {
            binaries.push(binary_info(def).await);
        }

        PathReport {
            base_dir: self.layout.base().to_path_buf(),
            config_file: self.layout.base().join("stackbox.toml"),
            document_root: self.layout.document_root(),
            log_dir: self.layout.log_dir(),
            backup_dir: self.layout.backup_dir(),
            binaries,
        }
    }
}

async fn binary_info(def: &ServiceDefinition) -> BinaryPathInfo {
    let exists = def.executable.is_file();
    let version = if exists {
        probe_version(&def.executable, def.key.kind()).await
    } else {
        None
    };
    BinaryPathInfo {
        service: def.key.to_string(),
        executable: def.executable.clone(),
        exists,
        version,
    }
}
