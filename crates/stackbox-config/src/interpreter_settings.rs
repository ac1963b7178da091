use crate::config::{default_active_interpreter, default_fastcgi_base_port, default_versions};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterSettings {
    /// Interpreter versions this installation knows about.
    /// Each version gets its own FastCGI service slot.
    #[serde(default = "default_versions")]
    pub versions: Vec<String>,

    /// Version the web server is wired to. Changing it only affects
    /// subsequent web-server starts, never a running process.
    #[serde(default = "default_active_interpreter")]
    pub active: String,

    /// First FastCGI port; version N listens on base + N's index
    #[serde(default = "default_fastcgi_base_port")]
    pub fastcgi_base_port: u16,
}

impl InterpreterSettings {
    /// FastCGI port for a configured version, by position in `versions`.
    pub fn port_for(&self, version: &str) -> Option<u16> {
        self.versions
            .iter()
            .position(|v| v == version)
            .map(|idx| self.fastcgi_base_port + idx as u16)
    }
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            versions: default_versions(),
            active: default_active_interpreter(),
            fastcgi_base_port: default_fastcgi_base_port(),
        }
    }
}
