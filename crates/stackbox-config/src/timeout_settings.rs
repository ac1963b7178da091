use crate::config::{
    default_database_start, default_interpreter_start, default_shutdown, default_web_server_start,
};

use serde::{Deserialize, Serialize};

/// Grace periods for lifecycle transitions. Every wait on an external
/// process is bounded by one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Startup grace for the web server (seconds)
    #[serde(default = "default_web_server_start")]
    pub web_server_start_secs: u64,

    /// Startup grace for the database server (seconds). The database is
    /// allowed materially longer than the web server; first-start
    /// initialization can be slow.
    #[serde(default = "default_database_start")]
    pub database_start_secs: u64,

    /// Startup grace for interpreter FastCGI services (seconds)
    #[serde(default = "default_interpreter_start")]
    pub interpreter_start_secs: u64,

    /// Graceful shutdown grace before escalating to a forced kill (seconds)
    #[serde(default = "default_shutdown")]
    pub shutdown_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            web_server_start_secs: default_web_server_start(),
            database_start_secs: default_database_start(),
            interpreter_start_secs: default_interpreter_start(),
            shutdown_secs: default_shutdown(),
        }
    }
}
