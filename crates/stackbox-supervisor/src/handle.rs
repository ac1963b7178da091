//! Ownership of one spawned service process.

use crate::error::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use stackbox_config::ServiceDefinition;
use tokio::process::{Child, Command};
use tracing::{info, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of a bounded stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopOutcome {
    /// Exited within the grace period after the polite signal
    Graceful { exit_code: Option<i32> },
    /// Had to be killed
    Forced,
}

/// Owns the child process of exactly one service. Dropping the handle
/// kills the child; services never outlive the supervisor.
pub(crate) struct ServiceHandle {
    child: Child,
    pid: u32,
    started_at: DateTime<Utc>,
}

impl ServiceHandle {
    /// Spawn the service process with stdout/stderr captured to its
    /// log file. The child is placed in its own session so stray
    /// terminal signals never reach it.
    pub(crate) fn spawn(def: &ServiceDefinition) -> SupervisorResult<Self> {
        let spawn_err = |source: std::io::Error| SupervisorError::ProcessSpawn {
            service: def.key.to_string(),
            source,
            location: ErrorLocation::from(Location::caller()),
        };

        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&def.log_file)
            .map_err(spawn_err)?;
        let log_err = log.try_clone().map_err(spawn_err)?;

        let mut cmd = Command::new(&def.executable);
        cmd.args(&def.args)
            .current_dir(&def.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let child = cmd.spawn().map_err(spawn_err)?;
        let pid = child.id().ok_or_else(|| {
            spawn_err(std::io::Error::other("child exited before pid could be read"))
        })?;

        info!(service = %def.key, pid, "Spawned service process");

        Ok(Self {
            child,
            pid,
            started_at: Utc::now(),
        })
    }

    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }

    pub(crate) fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Non-blocking exit check. `Some(code)` once the child has exited;
    /// the code is `None` when the child died to a signal.
    pub(crate) fn try_reap(&mut self) -> Option<Option<i32>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code()),
            Ok(None) => None,
            // The pid is gone entirely; treat as exited without a code
            Err(_) => Some(None),
        }
    }

    /// Ask the child to exit, escalating to a kill when the grace
    /// period runs out. Always leaves the child reaped.
    pub(crate) async fn terminate(&mut self, grace: Duration) -> StopOutcome {
        self.signal_term();

        let deadline = tokio::time::Instant::now() + grace;
        while tokio::time::Instant::now() < deadline {
            if let Some(exit_code) = self.try_reap() {
                info!(pid = self.pid, ?exit_code, "Service exited gracefully");
                return StopOutcome::Graceful { exit_code };
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }

        warn!(pid = self.pid, "Graceful stop timed out, killing process group");
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            // The setsid child leads its own group; killing the group
            // takes any grandchildren down with it
            killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL).ok();
        }
        // Reaps the child (and covers the non-unix path)
        if let Err(e) = self.child.kill().await {
            warn!(pid = self.pid, error = %e, "Kill failed; process already gone");
        }
        StopOutcome::Forced
    }

    fn signal_term(&self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            info!(pid = self.pid, "Sending SIGTERM to process group");
            killpg(Pid::from_raw(self.pid as i32), Signal::SIGTERM).ok();
        }

        #[cfg(windows)]
        {
            // No polite signal without a console; taskkill without /F
            // delivers WM_CLOSE where the process has a window
            std::process::Command::new("taskkill")
                .args(["/PID", &self.pid.to_string()])
                .output()
                .ok();
        }
    }
}
