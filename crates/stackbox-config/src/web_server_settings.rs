use crate::config::{default_host, default_web_server_port};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebServerSettings {
    /// Host to bind to (always 127.0.0.1 for security)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the web server listens on
    #[serde(default = "default_web_server_port")]
    pub port: u16,
}

impl Default for WebServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_web_server_port(),
        }
    }
}
