mod config;
mod database_settings;
mod definition;
mod error;
mod interpreter_settings;
mod layout;
mod logging_settings;
mod service_key;
mod timeout_settings;
mod web_server_settings;

#[cfg(test)]
mod tests;

pub use config::{CONFIG_VERSION, StackConfig};
pub use database_settings::DatabaseSettings;
pub use definition::ServiceDefinition;
pub use error::{ConfigError, Result as ConfigResult};
pub use interpreter_settings::InterpreterSettings;
pub use layout::DirectoryLayout;
pub use logging_settings::LoggingSettings;
pub use service_key::{ParseServiceKeyError, ServiceKey, ServiceKind, VersionTag};
pub use timeout_settings::TimeoutSettings;
pub use web_server_settings::WebServerSettings;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_WEB_SERVER_PORT: u16 = 8080;
const DEFAULT_DATABASE_PORT: u16 = 3306;
const DEFAULT_FASTCGI_BASE_PORT: u16 = 9000;
const DEFAULT_INTERPRETER_VERSIONS: [&str; 4] = ["8.1", "8.2", "8.3", "8.4"];
const DEFAULT_ACTIVE_INTERPRETER: &str = "8.2";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_WEB_SERVER_START_SECS: u64 = 10;
const DEFAULT_DATABASE_START_SECS: u64 = 30;
const DEFAULT_INTERPRETER_START_SECS: u64 = 10;
const DEFAULT_SHUTDOWN_SECS: u64 = 10;

const MIN_PORT: u16 = 1024;
