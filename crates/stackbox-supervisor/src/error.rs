use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use stackbox_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Binary for {service} not found at {path} {location}")]
    BinaryMissing {
        service: String,
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Port {port} for {service} is in use by another process {location}")]
    PortConflict {
        service: String,
        port: u16,
        owner_pid: Option<u32>,
        location: ErrorLocation,
    },

    #[error("A lifecycle operation for {service} is already in progress {location}")]
    OperationInProgress {
        service: String,
        location: ErrorLocation,
    },

    #[error("{service} failed to bind its port within {timeout_secs}s {location}")]
    StartupTimeout {
        service: String,
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("{service} (pid {pid}) ignored the stop request and was killed {location}")]
    ForcedTermination {
        service: String,
        pid: u32,
        location: ErrorLocation,
    },

    #[error("{service} exited unexpectedly with code {exit_code:?} {location}")]
    UnexpectedExit {
        service: String,
        exit_code: Option<i32>,
        location: ErrorLocation,
    },

    #[error("{service} is not running {location}")]
    ServiceNotRunning {
        service: String,
        location: ErrorLocation,
    },

    #[error("Failed to spawn {service}: {source} {location}")]
    ProcessSpawn {
        service: String,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Unknown service key '{key}' {location}")]
    UnknownService { key: String, location: ErrorLocation },

    #[error("Interpreter version {version} is not installed {location}")]
    VersionNotInstalled {
        version: String,
        location: ErrorLocation,
    },

    #[error("Filesystem operation failed: {source} {location}")]
    Filesystem {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Backup archive error: {source} {location}")]
    BackupArchive {
        #[source]
        source: zip::result::ZipError,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SupervisorError {
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::BinaryMissing { .. } => {
                "The service binary is not installed. \
                   Place the bundled binaries under the stack directory and retry."
            }
            Self::PortConflict { .. } => {
                "Another application is using the required port. \
                   Close it or change the port in stackbox.toml."
            }
            Self::OperationInProgress { .. } => {
                "A start or stop for this service is still running. \
                   Wait for it to finish and retry."
            }
            Self::StartupTimeout { .. } => {
                "The service did not come up in time. \
                   Check its log file under logs/ for startup errors."
            }
            Self::ForcedTermination { .. } => {
                "The service ignored the stop request and was killed. \
                   It can be started again; check its log file if this repeats."
            }
            Self::UnexpectedExit { .. } => {
                "The service crashed. \
                   Check its log file under logs/ for the cause before restarting."
            }
            Self::ServiceNotRunning { .. } => {
                "This operation needs the service running. Start it first."
            }
            Self::UnknownService { .. } | Self::VersionNotInstalled { .. } => {
                "The requested service or version does not exist in this installation."
            }
            Self::Filesystem { .. } | Self::BackupArchive { .. } => {
                "A file operation failed. \
                   Check permissions and available disk space in the stack directory."
            }
            Self::ProcessSpawn { .. } => {
                "The service process could not be started. \
                   Verify the binary is executable for the current user."
            }
            Self::Config(_) => {
                "Configuration file has invalid settings. \
                   Fix stackbox.toml or delete it to regenerate defaults."
            }
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Filesystem {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<zip::result::ZipError> for SupervisorError {
    #[track_caller]
    fn from(source: zip::result::ZipError) -> Self {
        Self::BackupArchive {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type SupervisorResult<T> = std::result::Result<T, SupervisorError>;
