//! Observable lifecycle state of one supervised service.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a service ended up in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FailureReason {
    /// The child process could not be spawned at all
    SpawnFailed { message: String },
    /// Spawned but never bound its port within the grace period
    StartupTimeout { timeout_secs: u64 },
    /// Ignored the graceful stop and had to be killed
    ForcedTermination,
    /// Exited on its own while we believed it was running
    UnexpectedExit { exit_code: Option<i32> },
}

/// Lifecycle phase of a service.
///
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`, with any
/// phase able to drop to `Failed`. `Failed` is recoverable; the next
/// start attempt goes back through `Starting`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum ServiceState {
    Stopped,
    Starting { pid: Option<u32> },
    Running {
        pid: u32,
        port: u16,
        since: DateTime<Utc>,
    },
    Stopping { pid: u32 },
    Failed { reason: FailureReason },
}

impl ServiceState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// In the middle of a transition; a concurrent toggle must be rejected.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Starting { .. } | Self::Stopping { .. })
    }

    /// A start attempt is permitted from these phases.
    pub fn is_startable(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed { .. })
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            Self::Starting { pid } => *pid,
            Self::Running { pid, .. } | Self::Stopping { pid } => Some(*pid),
            Self::Stopped | Self::Failed { .. } => None,
        }
    }
}

/// Point-in-time view of one service, safe to hand to any caller.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    /// Service key in its string form (`web-server`, `interpreter-8.2`, ...)
    pub key: String,
    pub display_name: String,
    /// Port the service binds when running
    pub port: u16,
    #[serde(flatten)]
    pub state: ServiceState,
    /// The service is not running yet something else holds its port
    pub port_conflict: bool,
    /// Pid of that foreign listener, where the platform exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_owner_pid: Option<u32>,
    pub observed_at: DateTime<Utc>,
}

/// Snapshot of the whole stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackSnapshot {
    pub services: Vec<ServiceSnapshot>,
    pub active_interpreter: String,
    pub generated_at: DateTime<Utc>,
}
