use crate::config::default_database_port;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Port the database server listens on
    #[serde(default = "default_database_port")]
    pub port: u16,

    /// Initialize an empty data directory on first start
    #[serde(default = "default_true")]
    pub initialize_on_first_start: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            port: default_database_port(),
            initialize_on_first_start: true,
        }
    }
}
