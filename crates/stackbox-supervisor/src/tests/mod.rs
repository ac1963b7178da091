mod commands;
mod reporter;
mod state;

use crate::probe::Prober;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stackbox_config::{ServiceDefinition, ServiceKey, VersionTag};
use tempfile::TempDir;

/// Scripted port prober. Pids are checked against the real kernel so
/// tests can supervise genuine child processes while ports stay under
/// test control.
pub(crate) struct FakeProber {
    bound: Mutex<HashSet<u16>>,
    /// Ports that report unbound for N more queries, then bound
    auto_bind: Mutex<HashMap<u16, usize>>,
}

impl FakeProber {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            bound: Mutex::new(HashSet::new()),
            auto_bind: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn set_bound(&self, port: u16, bound: bool) {
        let mut set = self.bound.lock().unwrap();
        if bound {
            set.insert(port);
        } else {
            set.remove(&port);
        }
    }

    /// Report the port unbound for `queries` checks, bound afterwards.
    /// Mirrors a service that needs a moment to open its listener.
    pub(crate) fn bind_after(&self, port: u16, queries: usize) {
        self.auto_bind.lock().unwrap().insert(port, queries);
    }
}

impl Prober for FakeProber {
    fn port_bound(&self, port: u16) -> bool {
        if self.bound.lock().unwrap().contains(&port) {
            return true;
        }
        let mut auto = self.auto_bind.lock().unwrap();
        match auto.get_mut(&port) {
            Some(0) => {
                auto.remove(&port);
                self.bound.lock().unwrap().insert(port);
                true
            }
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        }
    }

    fn pid_alive(&self, pid: u32) -> bool {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }

    fn listener_pid(&self, _port: u16) -> Option<u32> {
        None
    }
}

pub(crate) fn setup_base_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// A definition whose "service" is a shell one-liner. Lets lifecycle
/// tests drive real processes without any bundled binaries.
#[cfg(unix)]
pub(crate) fn script_definition(
    key: ServiceKey,
    port: u16,
    dir: &Path,
    script: &str,
) -> ServiceDefinition {
    let logs = dir.join("logs");
    std::fs::create_dir_all(&logs).unwrap();

    ServiceDefinition {
        display_name: format!("test {key}"),
        executable: "/bin/sh".into(),
        shell_executable: None,
        port,
        args: vec!["-c".into(), script.into()],
        working_dir: dir.to_path_buf(),
        data_dir: None,
        log_file: logs.join(format!("{key}.log")),
        start_grace: Duration::from_secs(2),
        stop_grace: Duration::from_secs(1),
        key,
    }
}

#[cfg(unix)]
pub(crate) fn sleeper_definition(key: ServiceKey, port: u16, dir: &Path) -> ServiceDefinition {
    script_definition(key, port, dir, "sleep 30")
}

pub(crate) fn interpreter_key(version: &str) -> ServiceKey {
    ServiceKey::Interpreter(VersionTag::new(version).unwrap())
}
