//! Port and process liveness probing.
//!
//! These checks are the source of truth that corrects the registry's
//! optimistic bookkeeping; they must be cheap and never touch a child's
//! stdio or otherwise block on process I/O.

const HOST: &str = "127.0.0.1";

/// Lightweight liveness checks over ports and pids.
pub trait Prober: Send + Sync {
    /// Is something listening on this loopback port?
    fn port_bound(&self, port: u16) -> bool;

    /// Is this process currently alive?
    fn pid_alive(&self, pid: u32) -> bool;

    /// Pid of the process listening on this port, where the platform
    /// exposes it. Best effort; `None` means unknown, not unbound.
    fn listener_pid(&self, port: u16) -> Option<u32>;
}

/// Probes the real operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProber;

impl Prober for SystemProber {
    /// Attempts to bind 127.0.0.1:port. Bind failure means something
    /// already holds the port; the probe socket itself is released as
    /// soon as the listener drops.
    fn port_bound(&self, port: u16) -> bool {
        std::net::TcpListener::bind((HOST, port)).is_err()
    }

    fn pid_alive(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            // Signal 0 performs the permission/existence check only
            unsafe { libc::kill(pid as i32, 0) == 0 }
        }
        #[cfg(windows)]
        {
            std::process::Command::new("tasklist")
                .args(["/FI", &format!("PID eq {pid}"), "/NH"])
                .output()
                .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
                .unwrap_or(false)
        }
    }

    fn listener_pid(&self, port: u16) -> Option<u32> {
        #[cfg(target_os = "linux")]
        {
            linux::listener_pid(port)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = port;
            None
        }
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::path::Path;

    const TCP_LISTEN: &str = "0A";
    const TABLES: [&str; 2] = ["/proc/net/tcp", "/proc/net/tcp6"];

    /// Walk the /proc/net/tcp* tables for a LISTEN socket on the port,
    /// then scan /proc/<pid>/fd for the process holding its inode.
    pub(super) fn listener_pid(port: u16) -> Option<u32> {
        let inode = TABLES.iter().find_map(|table| socket_inode(table, port))?;
        let target = format!("socket:[{inode}]");

        let proc_dir = std::fs::read_dir("/proc").ok()?;
        for entry in proc_dir.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            if process_owns_socket(&entry.path(), &target) {
                return Some(pid);
            }
        }
        None
    }

    fn socket_inode(table: &str, port: u16) -> Option<u64> {
        let table = std::fs::read_to_string(table).ok()?;
        for line in table.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (Some(local), Some(state), Some(inode)) =
                (fields.get(1), fields.get(3), fields.get(9))
            else {
                continue;
            };
            if *state != TCP_LISTEN {
                continue;
            }
            let Some((_, port_hex)) = local.split_once(':') else {
                continue;
            };
            if u16::from_str_radix(port_hex, 16) == Ok(port) {
                return inode.parse().ok();
            }
        }
        None
    }

    fn process_owns_socket(proc_entry: &Path, target: &str) -> bool {
        let Ok(fds) = std::fs::read_dir(proc_entry.join("fd")) else {
            return false;
        };
        fds.flatten().any(|fd| {
            std::fs::read_link(fd.path())
                .map(|link| link.as_os_str().to_string_lossy() == *target)
                .unwrap_or(false)
        })
    }
}
