//! Static launch descriptions for every supervised service.

use crate::{DirectoryLayout, ServiceKey, StackConfig, VersionTag};

use std::path::PathBuf;
use std::time::Duration;

/// Everything the supervisor needs to launch and watch one service.
/// Built once from config + layout; never mutated at runtime.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub key: ServiceKey,
    pub display_name: String,

    /// Daemon binary, absolute
    pub executable: PathBuf,

    /// Interactive companion binary, if the service has one
    /// (the interpreter CLI next to the FastCGI daemon)
    pub shell_executable: Option<PathBuf>,

    /// Loopback port the service must end up listening on
    pub port: u16,

    pub args: Vec<String>,
    pub working_dir: PathBuf,

    /// Data directory that must be populated before first start
    pub data_dir: Option<PathBuf>,

    /// Where the child's stdout/stderr are captured
    pub log_file: PathBuf,

    pub start_grace: Duration,
    pub stop_grace: Duration,
}

/// Platform binary name: `httpd` stays `httpd` on Unix, becomes
/// `httpd.exe` on Windows.
pub(crate) fn executable_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

impl ServiceDefinition {
    /// Build the full service catalog for one installation.
    ///
    /// Interpreter versions that fail tag validation are skipped; the
    /// config validator has already rejected empty version lists, and a
    /// malformed tag in a hand-edited file should not take down the
    /// rest of the stack.
    pub fn catalog(config: &StackConfig, layout: &DirectoryLayout) -> Vec<Self> {
        let mut catalog = vec![Self::web_server(config, layout), Self::database(config, layout)];

        for version in &config.interpreter.versions {
            let (Ok(tag), Some(port)) =
                (VersionTag::new(version.clone()), config.interpreter.port_for(version))
            else {
                continue;
            };
            catalog.push(Self::interpreter(layout, tag, port, config));
        }

        catalog
    }

    fn web_server(config: &StackConfig, layout: &DirectoryLayout) -> Self {
        let conf_file = layout.config_dir().join("httpd.conf");
        Self {
            key: ServiceKey::WebServer,
            display_name: "Apache HTTP Server".into(),
            executable: layout.web_server_bin().join(executable_name("httpd")),
            shell_executable: None,
            port: config.web_server.port,
            args: vec![
                "-f".into(),
                conf_file.display().to_string(),
                "-D".into(),
                "FOREGROUND".into(),
            ],
            working_dir: layout.web_server_root(),
            data_dir: None,
            log_file: layout.log_dir().join("web-server.log"),
            start_grace: Duration::from_secs(config.timeouts.web_server_start_secs),
            stop_grace: Duration::from_secs(config.timeouts.shutdown_secs),
        }
    }

    fn database(config: &StackConfig, layout: &DirectoryLayout) -> Self {
        let defaults_file = layout.config_dir().join("my.cnf");
        let mut args = vec![format!("--defaults-file={}", defaults_file.display())];
        if cfg!(windows) {
            // Keeps the server attached to the console instead of
            // detaching as a Windows service
            args.push("--console".into());
        }
        Self {
            key: ServiceKey::Database,
            display_name: "MySQL Server".into(),
            executable: layout.database_bin().join(executable_name("mysqld")),
            shell_executable: None,
            port: config.database.port,
            args,
            working_dir: layout.database_root(),
            data_dir: Some(layout.database_data()),
            log_file: layout.log_dir().join("database.log"),
            start_grace: Duration::from_secs(config.timeouts.database_start_secs),
            stop_grace: Duration::from_secs(config.timeouts.shutdown_secs),
        }
    }

    fn interpreter(
        layout: &DirectoryLayout,
        tag: VersionTag,
        port: u16,
        config: &StackConfig,
    ) -> Self {
        let dir = layout.interpreter_dir(tag.as_str());
        Self {
            display_name: format!("PHP {tag} FastCGI"),
            executable: dir.join(executable_name("php-cgi")),
            shell_executable: Some(dir.join(executable_name("php"))),
            port,
            args: vec!["-b".into(), format!("127.0.0.1:{port}")],
            working_dir: dir,
            data_dir: None,
            log_file: layout.log_dir().join(format!("interpreter-{tag}.log")),
            start_grace: Duration::from_secs(config.timeouts.interpreter_start_secs),
            stop_grace: Duration::from_secs(config.timeouts.shutdown_secs),
            key: ServiceKey::Interpreter(tag),
        }
    }
}
