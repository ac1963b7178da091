//! Binary presence checks for the service catalog.

use crate::error::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use serde::Serialize;
use stackbox_config::ServiceDefinition;

/// Presence report for one expected binary.
#[derive(Debug, Clone, Serialize)]
pub struct BinaryReport {
    pub service: String,
    pub display_name: String,
    pub path: PathBuf,
    pub found: bool,
}

/// A binary counts as present only when it can actually be run. A file
/// without the executable bit would otherwise slip past the check and
/// die later with an opaque spawn error.
fn is_runnable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    true
}

/// Check every binary the catalog expects, daemons and interactive
/// companions alike. Purely informational; missing binaries are
/// reported, not errors.
pub fn check_binaries(catalog: &[ServiceDefinition]) -> Vec<BinaryReport> {
    let mut reports = Vec::new();
    for def in catalog {
        reports.push(BinaryReport {
            service: def.key.to_string(),
            display_name: def.display_name.clone(),
            path: def.executable.clone(),
            found: is_runnable(&def.executable),
        });
        if let Some(shell) = &def.shell_executable {
            reports.push(BinaryReport {
                service: def.key.to_string(),
                display_name: format!("{} (CLI)", def.display_name),
                path: shell.clone(),
                found: is_runnable(shell),
            });
        }
    }
    reports
}

/// Start-time precondition: the daemon binary must exist and be executable.
pub(crate) fn require(def: &ServiceDefinition) -> SupervisorResult<&Path> {
    if is_runnable(&def.executable) {
        Ok(&def.executable)
    } else {
        Err(SupervisorError::BinaryMissing {
            service: def.key.to_string(),
            path: def.executable.clone(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Precondition for the interactive shell: the companion binary must exist.
pub(crate) fn require_shell(def: &ServiceDefinition) -> SupervisorResult<&Path> {
    match &def.shell_executable {
        Some(shell) if is_runnable(shell) => Ok(shell),
        Some(shell) => Err(SupervisorError::BinaryMissing {
            service: def.key.to_string(),
            path: shell.clone(),
            location: ErrorLocation::from(Location::caller()),
        }),
        None => Err(SupervisorError::BinaryMissing {
            service: def.key.to_string(),
            path: def.executable.clone(),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
