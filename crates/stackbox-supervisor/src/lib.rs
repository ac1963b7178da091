//! Supervision of the bundled local stack: one web server, one database
//! server, and any number of script interpreter versions, each running
//! as a plain child process on a loopback port.

mod backup;
mod bootstrap;
mod commands;
mod error;
mod handle;
mod locator;
mod probe;
mod registry;
mod reporter;
mod state;
mod version;

#[cfg(test)]
mod tests;

pub use backup::BackupReport;
pub use bootstrap::BootstrapReport;
pub use commands::{BinaryPathInfo, ControlPanel, InterpreterInfo, PathReport, ShellOutcome};
pub use error::{SupervisorError, SupervisorResult};
pub use locator::{BinaryReport, check_binaries};
pub use probe::{Prober, SystemProber};
pub use registry::ServiceRegistry;
pub use reporter::StatusReporter;
pub use state::{FailureReason, ServiceSnapshot, ServiceState, StackSnapshot};
pub use version::probe_version;
